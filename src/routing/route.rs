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

use crate::error::{Error, Result};
use crate::tunnel::{Activation, Connector, TunnelClient};
use glob::{MatchOptions, Pattern};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Static definition of a route, as read from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub name: String,
    /// SSH config alias or address of the tunnel endpoint (broker host for
    /// broker routes)
    pub host_name: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    /// Shell globs tested in order against the full destination domain
    pub target_patterns: Vec<String>,
    pub use_local_broker: bool,
}

#[derive(Default)]
enum Slot {
    #[default]
    Inactive,
    Active {
        activation: Activation,
        /// Sessions currently holding this activation
        leases: usize,
    },
}

/// A route and its tunnel activation state.
///
/// `activate` and `deactivate` are serialized by an async mutex; while a
/// connect is in flight other callers wait on the lock.
pub struct Route {
    spec: RouteSpec,
    patterns: Vec<Pattern>,
    slot: Mutex<Slot>,
}

impl Route {
    /// Compile the route's patterns.
    pub fn new(spec: RouteSpec) -> Result<Self> {
        let patterns = spec
            .target_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| Error::GlobPattern {
                    route: spec.name.clone(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            spec,
            patterns,
            slot: Mutex::new(Slot::Inactive),
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &RouteSpec {
        &self.spec
    }

    /// Whether `domain` matches one of the route's patterns (ASCII case-insensitive)
    pub fn matches(&self, domain: &str) -> bool {
        self.matching_pattern(domain).is_some()
    }

    /// First pattern, in configured order, that matches `domain`
    pub fn matching_pattern(&self, domain: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|pattern| pattern.matches_with(domain, MATCH_OPTIONS))
            .map(Pattern::as_str)
    }

    /// Return the route's client, connecting first if the route is inactive.
    ///
    /// Every successful call takes a lease that must be returned with
    /// [`deactivate`](Self::deactivate). A failed connect leaves the route
    /// inactive so the next caller retries.
    pub async fn activate(&self, connector: &dyn Connector) -> Result<Arc<TunnelClient>> {
        let mut slot = self.slot.lock().await;

        if let Slot::Active { activation, leases } = &mut *slot {
            *leases += 1;
            debug!("Route '{}' already active ({} leases)", self.name(), leases);
            return Ok(Arc::clone(&activation.client));
        }

        debug!("Activating route '{}'", self.name());
        let activation = connector.connect(&self.spec).await?;
        let client = Arc::clone(&activation.client);
        *slot = Slot::Active {
            activation,
            leases: 1,
        };
        info!("Route '{}' active", self.name());
        Ok(client)
    }

    /// Return one lease. The last lease tears the tunnel down.
    pub async fn deactivate(&self) {
        let mut slot = self.slot.lock().await;

        let Slot::Active { leases, .. } = &mut *slot else {
            return;
        };
        *leases = leases.saturating_sub(1);
        if *leases > 0 {
            debug!("Route '{}' still has {} leases", self.name(), leases);
            return;
        }

        if let Slot::Active { activation, .. } = std::mem::take(&mut *slot) {
            activation.teardown().await;
            info!("Route '{}' deactivated", self.name());
        }
    }

    /// Tear the tunnel down regardless of outstanding leases.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Slot::Active { activation, leases } = std::mem::take(&mut *slot) {
            debug!(
                "Shutting down route '{}' with {} leases outstanding",
                self.name(),
                leases
            );
            activation.teardown().await;
        }
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.slot.lock().await, Slot::Active { .. })
    }

    /// Number of sessions currently holding the activation
    pub async fn lease_count(&self) -> usize {
        match *self.slot.lock().await {
            Slot::Active { leases, .. } => leases,
            Slot::Inactive => 0,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
