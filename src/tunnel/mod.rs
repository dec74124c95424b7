// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tunnel transports.
//!
//! A [`Connector`] turns a route definition into an [`Activation`]: a live
//! [`TunnelClient`] plus whatever must be released when the route goes idle.

mod client;
mod connector;
pub mod relay;

pub use client::{TunnelClient, TunnelStream};
pub use connector::{Connector, SshConnector};
pub use relay::{relay, RelayEnd, RelayStats};

use std::fmt;
use std::sync::Arc;

/// Deferred action run once when an activation is torn down
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// A connected tunnel together with its cleanup action.
pub struct Activation {
    pub client: Arc<TunnelClient>,
    pub cleanup: Option<Cleanup>,
}

impl Activation {
    pub fn new(client: TunnelClient) -> Self {
        Self {
            client: Arc::new(client),
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Run the cleanup action, then close the client.
    pub async fn teardown(self) {
        if let Some(cleanup) = self.cleanup {
            cleanup();
        }
        self.client.close().await;
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("client", &self.client)
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_teardown_runs_cleanup_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let activation = Activation::new(TunnelClient::LocalBroker {
            proxy_addr: "127.0.0.1:1".to_string(),
            connect_timeout: None,
        })
        .with_cleanup(Box::new(move || flag.store(true, Ordering::SeqCst)));

        activation.teardown().await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
