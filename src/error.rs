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

//! Error types shared by the proxy core.
//!
//! Every variant is local to one connection session: it ends that session,
//! gets logged, and never takes the listener down.

use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while serving a SOCKS client or bringing up a tunnel.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound stream ended early or could not be read.
    #[error("malformed SOCKS5 request: {0}")]
    Protocol(#[source] io::Error),

    #[error("unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    #[error("client offered no authentication methods")]
    NoAuthMethod,

    #[error("unsupported SOCKS5 command: {0:#04x}")]
    UnsupportedCommand(u8),

    #[error("unsupported SOCKS5 address type: {0:#04x}")]
    UnsupportedAddressType(u8),

    #[error("no route matches destination '{0}'")]
    NoMatchingRoute(String),

    #[error("invalid target pattern '{pattern}' in route '{route}': {source}")]
    GlobPattern {
        route: String,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("SSH agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("missing or invalid {field} for host '{host}'")]
    HostConfig { host: String, field: &'static str },

    #[error("failed to reach {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: DialFailure,
    },

    /// The relay ended with an I/O error on either side.
    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn dial(target: impl Into<String>, source: impl Into<DialFailure>) -> Self {
        Self::Dial {
            target: target.into(),
            source: source.into(),
        }
    }

    pub(crate) fn host_config(host: impl Into<String>, field: &'static str) -> Self {
        Self::HostConfig {
            host: host.into(),
            field,
        }
    }
}

/// Why a hop (TCP, SSH or SOCKS) could not be established.
#[derive(Debug, Error)]
pub enum DialFailure {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error(transparent)]
    Socks(#[from] tokio_socks::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication rejected for user '{0}'")]
    AuthRejected(String),
}
