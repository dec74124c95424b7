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

use russh::keys::known_hosts::learn_known_hosts_path;
use russh::keys::{check_known_hosts_path, PublicKey};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum StrictHostKeyChecking {
    /// Only accept keys already present in known_hosts
    Yes,
    /// Accept any key
    #[default]
    No,
    /// Record unknown keys, reject changed ones
    AcceptNew,
}

impl StrictHostKeyChecking {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::No)
    }

    /// Decide whether `key` presented by `host:port` is acceptable, using
    /// `~/.ssh/known_hosts`.
    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> bool {
        if self.is_disabled() {
            return true;
        }
        match get_default_known_hosts_path() {
            Some(path) => self.verify_with_file(host, port, key, &path),
            None => {
                tracing::debug!("No home directory, known_hosts unavailable");
                *self != Self::Yes
            }
        }
    }

    /// Same as [`verify`](Self::verify) against an explicit known_hosts file.
    ///
    /// Lookup failures other than a changed key count as "not known".
    pub fn verify_with_file(&self, host: &str, port: u16, key: &PublicKey, path: &Path) -> bool {
        if self.is_disabled() {
            return true;
        }

        match check_known_hosts_path(host, port, key, path) {
            Ok(true) => {
                tracing::trace!("Host key for {}:{} found in known_hosts", host, port);
                true
            }
            Ok(false) => self.on_unknown_key(host, port, key, path),
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    "Host key for {}:{} does not match {} line {}",
                    host,
                    port,
                    path.display(),
                    line
                );
                false
            }
            Err(e) => {
                tracing::debug!("Could not read {}: {}", path.display(), e);
                self.on_unknown_key(host, port, key, path)
            }
        }
    }

    fn on_unknown_key(&self, host: &str, port: u16, key: &PublicKey, path: &Path) -> bool {
        match self {
            Self::Yes => {
                tracing::warn!(
                    "Host key for {}:{} is not in known_hosts, rejecting",
                    host,
                    port
                );
                false
            }
            Self::AcceptNew => {
                if let Err(e) = learn_known_hosts_path(host, port, key, path) {
                    tracing::warn!("Failed to record host key for {}:{}: {}", host, port, e);
                } else {
                    tracing::info!("Recorded new host key for {}:{}", host, port);
                }
                true
            }
            Self::No => true,
        }
    }
}

impl FromStr for StrictHostKeyChecking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" | "off" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(format!(
                "unknown host key checking mode '{other}' (expected yes, no or accept-new)"
            )),
        }
    }
}

impl TryFrom<String> for StrictHostKeyChecking {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StrictHostKeyChecking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::AcceptNew => "accept-new",
        })
    }
}
