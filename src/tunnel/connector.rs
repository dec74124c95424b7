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

use super::{Activation, TunnelClient};
use crate::error::{Error, Result};
use crate::jump::{parse_jump_hosts, JumpHostChain};
use crate::routing::RouteSpec;
use crate::ssh::{
    ConnectSettings, Credentials, HostField, SshConfig, SshTarget, StrictHostKeyChecking,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Brings up the transport for a route.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, route: &RouteSpec) -> Result<Activation>;
}

/// Production connector: injected credentials (the SSH agent in the binary),
/// SSH config for host parameters.
#[derive(Debug, Clone)]
pub struct SshConnector {
    credentials: Arc<dyn Credentials>,
    ssh_config: Arc<SshConfig>,
    settings: ConnectSettings,
}

impl SshConnector {
    pub fn new(
        credentials: impl Credentials + 'static,
        ssh_config: Arc<SshConfig>,
        settings: ConnectSettings,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            ssh_config,
            settings,
        }
    }

    pub fn settings(&self) -> &ConnectSettings {
        &self.settings
    }

    /// Resolve an SSH endpoint: explicit values first, then the SSH config,
    /// then defaults. `User` has no default.
    pub fn resolve_target(
        &self,
        alias: &str,
        user: Option<&str>,
        port: Option<u16>,
    ) -> Result<SshTarget> {
        let config = &self.ssh_config;
        let user = config
            .get_effective_user(alias, user)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::host_config(alias, "User"))?;

        let host_key_check = match config.lookup(alias, HostField::StrictHostKeyChecking) {
            Some(value) => value.parse::<StrictHostKeyChecking>().unwrap_or_else(|e| {
                warn!("Ignoring StrictHostKeyChecking for {}: {}", alias, e);
                self.settings.host_key_check
            }),
            None => self.settings.host_key_check,
        };

        Ok(SshTarget {
            alias: alias.to_string(),
            host: config.get_effective_hostname(alias),
            port: config.get_effective_port(alias, port),
            user,
            host_key_check,
        })
    }

    /// Destination plus the jump hops configured for it
    pub fn resolve_chain(&self, route: &RouteSpec) -> Result<JumpHostChain> {
        let alias = route.host_name.as_str();
        let destination = self.resolve_target(alias, route.user.as_deref(), route.port)?;

        let hops = match self.ssh_config.get_proxy_jump(alias) {
            Some(spec) => parse_jump_hosts(&spec).map_err(|e| {
                warn!("Invalid ProxyJump '{}' for {}: {:#}", spec, alias, e);
                Error::host_config(alias, "ProxyJump")
            })?,
            None => Vec::new(),
        };

        let hops = hops
            .iter()
            .map(|hop| self.resolve_target(&hop.host, hop.user.as_deref(), hop.port))
            .collect::<Result<Vec<_>>>()?;

        Ok(JumpHostChain::new(hops, destination))
    }

    fn broker_address(&self, route: &RouteSpec) -> Result<String> {
        let alias = route.host_name.as_str();
        let port = match route.port {
            Some(port) => port,
            None => self
                .ssh_config
                .find_host_config(alias)
                .port
                .ok_or_else(|| Error::host_config(alias, "Port"))?,
        };
        Ok(format!("{alias}:{port}"))
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, route: &RouteSpec) -> Result<Activation> {
        let mut auth = self.credentials.open().await?;

        if route.use_local_broker {
            let proxy_addr = self.broker_address(route)?;
            info!("Route '{}' uses local broker {}", route.name, proxy_addr);
            let client = TunnelClient::LocalBroker {
                proxy_addr,
                connect_timeout: self.settings.connect_timeout,
            };
            return Ok(Activation::new(client).with_cleanup(auth.into_cleanup()));
        }

        let chain = self.resolve_chain(route)?;
        debug!("Route '{}' resolved to {}", route.name, chain);

        let connection = chain.connect(&self.settings, &mut *auth).await?;
        let client = if connection.jumps.is_empty() {
            TunnelClient::Direct(connection.client)
        } else {
            TunnelClient::JumpChained(connection)
        };

        info!("Route '{}' connected: {}", route.name, client);
        Ok(Activation::new(client).with_cleanup(auth.into_cleanup()))
    }
}
