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

//! Configuration loading, validation and priority management.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::types::Config;
use super::utils::{default_config_path, expand_tilde};
use crate::error::Error;
use crate::routing::RouteSpec;
use crate::ssh::client::ConnectSettings;

impl Config {
    /// Parse and validate TOML configuration.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        let content = fs::read_to_string(&expanded_path).await.with_context(|| {
            format!(
                "Failed to read configuration file at {}",
                expanded_path.display()
            )
        })?;

        Self::parse(&content)
            .with_context(|| format!("Invalid configuration in {}", expanded_path.display()))
    }

    /// Load configuration with priority order:
    /// 1. Explicit --config path (must exist)
    /// 2. `config.toml` in the current directory
    /// 3. `$XDG_CONFIG_HOME/proxs/config.toml` or `~/.config/proxs/config.toml`
    ///
    /// Returns the configuration together with the file it came from.
    pub async fn load_with_priority(cli_config_path: Option<&Path>) -> Result<(Self, PathBuf)> {
        if let Some(path) = cli_config_path {
            let path = expand_tilde(path);
            tracing::debug!("Using explicitly specified config file: {:?}", path);
            let config = Self::load(&path).await?;
            return Ok((config, path));
        }

        let mut candidates = vec![PathBuf::from("config.toml")];
        candidates.extend(default_config_path());

        for candidate in candidates {
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                tracing::debug!("Found config at {:?}", candidate);
                let config = Self::load(&candidate).await?;
                return Ok((config, candidate));
            }
            tracing::trace!("No config at {:?}", candidate);
        }

        anyhow::bail!(
            "No configuration file found. Pass --config or create {}",
            default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "./config.toml".to_string())
        )
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        if self.max_connections == Some(0) {
            return Err(Error::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        for (name, entry) in &self.proxy {
            if entry.hostname.trim().is_empty() {
                return Err(Error::Config(format!(
                    "proxy '{name}' has an empty hostname"
                )));
            }
            if entry.use_ssh_client && entry.port.is_none() {
                return Err(Error::Config(format!(
                    "proxy '{name}' uses a local broker and needs a port"
                )));
            }
            if entry.port == Some(0) {
                return Err(Error::Config(format!("proxy '{name}' has port 0")));
            }
        }
        Ok(())
    }

    /// Route definitions in document order
    pub fn routes(&self) -> Vec<RouteSpec> {
        self.proxy
            .iter()
            .map(|(name, entry)| entry.to_route_spec(name))
            .collect()
    }

    pub fn connect_settings(&self) -> ConnectSettings {
        ConnectSettings {
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
            keepalive_interval: self.keepalive_interval.map(Duration::from_secs),
            host_key_check: self.strict_host_key_checking,
        }
    }

    /// `ssh_config` with `~` expanded
    pub fn ssh_config_path(&self) -> Option<PathBuf> {
        self.ssh_config.as_deref().map(expand_tilde)
    }

    /// `agent_socket` with `~` expanded
    pub fn agent_socket_path(&self) -> Option<PathBuf> {
        self.agent_socket.as_deref().map(expand_tilde)
    }
}
