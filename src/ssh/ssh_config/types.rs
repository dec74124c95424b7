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

//! Core data structures for SSH configuration

use std::fmt;

/// One `Host` block of an OpenSSH client configuration.
///
/// Only the keywords needed to bring up a tunnel are retained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SshHostConfig {
    pub host_patterns: Vec<String>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub proxy_jump: Option<String>,
    pub strict_host_key_checking: Option<String>,
    /// Line of the `Host` keyword, 0 for the implicit global block
    pub line_number: usize,
}

impl fmt::Display for SshHostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host {}", self.host_patterns.join(" "))?;
        if let Some(ref hostname) = self.hostname {
            write!(f, " ({hostname})")?;
        }
        if let Some(ref user) = self.user {
            write!(f, " user={user}")?;
        }
        if let Some(port) = self.port {
            write!(f, " port={port}")?;
        }
        if let Some(ref jump) = self.proxy_jump {
            write!(f, " jump={jump}")?;
        }
        Ok(())
    }
}

/// Keys accepted by [`SshConfig::lookup`](super::SshConfig::lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostField {
    HostName,
    User,
    Port,
    ProxyJump,
    StrictHostKeyChecking,
}

impl HostField {
    pub fn keyword(self) -> &'static str {
        match self {
            HostField::HostName => "HostName",
            HostField::User => "User",
            HostField::Port => "Port",
            HostField::ProxyJump => "ProxyJump",
            HostField::StrictHostKeyChecking => "StrictHostKeyChecking",
        }
    }
}

impl fmt::Display for HostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
