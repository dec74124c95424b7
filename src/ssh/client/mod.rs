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

//! russh client wrapper used for every SSH hop of a tunnel.

mod connection;

pub use connection::{bounded, Client};

use super::known_hosts::StrictHostKeyChecking;
use russh::client::Handler;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A fully resolved SSH endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Name the endpoint was configured under, used in logs
    pub alias: String,
    /// Address actually dialed
    pub host: String,
    pub port: u16,
    pub user: String,
    pub host_key_check: StrictHostKeyChecking,
}

impl SshTarget {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)?;
        if self.alias != self.host {
            write!(f, " ({})", self.alias)?;
        }
        Ok(())
    }
}

/// Connection-wide knobs shared by every hop.
#[derive(Debug, Clone, Default)]
pub struct ConnectSettings {
    /// Applied separately to each TCP dial, SSH handshake and channel open
    pub connect_timeout: Option<Duration>,
    pub keepalive_interval: Option<Duration>,
    /// Used for hosts whose SSH config does not set `StrictHostKeyChecking`
    pub host_key_check: StrictHostKeyChecking,
}

impl ConnectSettings {
    pub(crate) fn russh_config(&self) -> Arc<russh::client::Config> {
        Arc::new(russh::client::Config {
            keepalive_interval: self.keepalive_interval,
            ..Default::default()
        })
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    host_key_check: StrictHostKeyChecking,
}

impl ClientHandler {
    pub fn new(target: &SshTarget) -> Self {
        Self {
            hostname: target.host.clone(),
            port: target.port,
            host_key_check: target.host_key_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self
            .host_key_check
            .verify(&self.hostname, self.port, server_public_key))
    }
}
