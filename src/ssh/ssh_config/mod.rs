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

//! SSH configuration parsing and lookup
//!
//! Supplies the per-host parameters (`HostName`, `User`, `Port`, `ProxyJump`,
//! `StrictHostKeyChecking`) used to bring up tunnels.

use anyhow::{Context, Result};
use std::path::Path;

mod parser;
mod pattern;
mod resolver;
mod types;

pub use types::{HostField, SshHostConfig};

/// Parsed OpenSSH client configuration
#[derive(Debug, Clone, Default)]
pub struct SshConfig {
    pub hosts: Vec<SshHostConfig>,
}

impl SshConfig {
    /// Create a new empty SSH configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load SSH configuration from a file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read SSH config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse SSH config file: {}", path.display()))
    }

    /// Load SSH configuration from the default locations
    pub async fn load_default() -> Result<Self> {
        if let Some(home_dir) = dirs::home_dir() {
            let user_config = home_dir.join(".ssh").join("config");
            if tokio::fs::try_exists(&user_config).await.unwrap_or(false) {
                return Self::load_from_file(&user_config).await;
            }
        }

        let system_config = Path::new("/etc/ssh/ssh_config");
        if tokio::fs::try_exists(system_config).await.unwrap_or(false) {
            return Self::load_from_file(system_config).await;
        }

        Ok(Self::new())
    }

    /// Load from `path` when given, otherwise from the default locations
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path).await,
            None => Self::load_default().await,
        }
    }

    /// Parse SSH configuration from a string
    pub fn parse(content: &str) -> Result<Self> {
        let hosts = parser::parse(content)?;
        Ok(Self { hosts })
    }

    /// Effective configuration for `alias` with `%h` already expanded
    pub fn find_host_config(&self, alias: &str) -> SshHostConfig {
        resolver::find_host_config(&self.hosts, alias)
    }

    /// Keyed lookup of a single field; `None` when no matching block sets it
    pub fn lookup(&self, alias: &str, field: HostField) -> Option<String> {
        let host = self.find_host_config(alias);
        match field {
            HostField::HostName => host.hostname,
            HostField::User => host.user,
            HostField::Port => host.port.map(|p| p.to_string()),
            HostField::ProxyJump => host.proxy_jump,
            HostField::StrictHostKeyChecking => host.strict_host_key_checking,
        }
    }

    /// Effective hostname, falling back to the alias itself
    pub fn get_effective_hostname(&self, alias: &str) -> String {
        self.lookup(alias, HostField::HostName)
            .unwrap_or_else(|| alias.to_string())
    }

    /// Effective port; `override_port` wins, then the config, then 22
    pub fn get_effective_port(&self, alias: &str, override_port: Option<u16>) -> u16 {
        override_port
            .or_else(|| self.find_host_config(alias).port)
            .unwrap_or(22)
    }

    /// Effective user; `override_user` wins over the config
    pub fn get_effective_user(&self, alias: &str, override_user: Option<&str>) -> Option<String> {
        override_user
            .map(str::to_string)
            .or_else(|| self.lookup(alias, HostField::User))
    }

    /// `ProxyJump` for `alias`, with `none` meaning no jump
    pub fn get_proxy_jump(&self, alias: &str) -> Option<String> {
        self.lookup(alias, HostField::ProxyJump)
            .filter(|jump| !jump.eq_ignore_ascii_case("none"))
    }
}
