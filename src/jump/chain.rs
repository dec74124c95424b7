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

//! Multi-hop SSH connection establishment.
//!
//! The first hop is reached over TCP. Every later hop, and finally the
//! destination, is reached by SSH over a `direct-tcpip` channel opened on the
//! previous hop's session.

use crate::error::Result;
use crate::ssh::auth::Authenticator;
use crate::ssh::client::{Client, ConnectSettings, SshTarget};
use std::fmt;
use tracing::{debug, info};

/// Resolved hops leading to a destination.
#[derive(Debug, Clone)]
pub struct JumpHostChain {
    hops: Vec<SshTarget>,
    destination: SshTarget,
}

/// Sessions produced by [`JumpHostChain::connect`].
#[derive(Debug)]
pub struct JumpConnection {
    /// Jump sessions in hop order
    pub jumps: Vec<Client>,
    /// Session with the destination
    pub client: Client,
}

impl JumpConnection {
    /// Disconnect the destination first, then each jump in reverse order.
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
        release(&self.jumps).await;
    }
}

impl JumpHostChain {
    pub fn new(hops: Vec<SshTarget>, destination: SshTarget) -> Self {
        Self { hops, destination }
    }

    pub fn is_direct(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn hops(&self) -> &[SshTarget] {
        &self.hops
    }

    pub fn destination(&self) -> &SshTarget {
        &self.destination
    }

    /// Establish every hop and the destination session.
    ///
    /// On failure, sessions opened so far are disconnected before returning.
    pub async fn connect(
        &self,
        settings: &ConnectSettings,
        auth: &mut dyn Authenticator,
    ) -> Result<JumpConnection> {
        if self.is_direct() {
            let client = Client::connect(&self.destination, settings, auth).await?;
            return Ok(JumpConnection {
                jumps: Vec::new(),
                client,
            });
        }

        info!("Connecting via {}", self);

        let mut jumps = Vec::with_capacity(self.hops.len());
        jumps.push(Client::connect(&self.hops[0], settings, auth).await?);

        for next in &self.hops[1..] {
            let hop = extend(&jumps, next, settings, auth).await?;
            jumps.push(hop);
        }
        let client = extend(&jumps, &self.destination, settings, auth).await?;

        Ok(JumpConnection { jumps, client })
    }
}

impl fmt::Display for JumpHostChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hop in &self.hops {
            write!(f, "{} -> ", hop.alias)?;
        }
        write!(f, "{}", self.destination.alias)
    }
}

/// Reach `next` through the last session in `jumps` (never empty).
///
/// Every session in `jumps` is disconnected if this fails.
async fn extend(
    jumps: &[Client],
    next: &SshTarget,
    settings: &ConnectSettings,
    auth: &mut dyn Authenticator,
) -> Result<Client> {
    let previous = &jumps[jumps.len() - 1];
    debug!("Opening tunnel to {} through {}", next, previous.target().alias);

    let result = match previous
        .open_direct_tcpip_channel(&next.host, next.port)
        .await
    {
        Ok(stream) => Client::connect_stream(stream, next, settings, auth).await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        release(jumps).await;
    }
    result
}

async fn release(clients: &[Client]) {
    for client in clients.iter().rev() {
        client.disconnect().await;
    }
}
