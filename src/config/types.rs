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

//! Configuration type definitions.

use crate::routing::RouteSpec;
use crate::ssh::known_hosts::StrictHostKeyChecking;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Local SOCKS5 listen port
    pub port: u16,

    #[serde(default = "default_listen_address")]
    pub listen_address: IpAddr,

    /// Seconds allowed for each TCP dial, SSH handshake and channel open
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// Seconds between SSH keepalive requests
    #[serde(default)]
    pub keepalive_interval: Option<u64>,

    #[serde(default)]
    pub max_connections: Option<usize>,

    #[serde(default)]
    pub strict_host_key_checking: StrictHostKeyChecking,

    /// OpenSSH client config to read host parameters from
    #[serde(default)]
    pub ssh_config: Option<PathBuf>,

    /// Agent socket; `SSH_AUTH_SOCK` when unset
    #[serde(default)]
    pub agent_socket: Option<PathBuf>,

    /// `[proxy.<name>]` tables in document order
    #[serde(default, deserialize_with = "ordered_entries")]
    pub proxy: Vec<(String, ProxyEntry)>,
}

/// One `[proxy.<name>]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProxyEntry {
    /// SSH config alias or host; broker host when `use_ssh_client` is set
    pub hostname: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default, alias = "target_patterns")]
    pub target_addrs: Vec<String>,

    /// Route through a SOCKS5 broker at `hostname:port` instead of SSH
    #[serde(default, alias = "use_local_broker")]
    pub use_ssh_client: bool,
}

impl ProxyEntry {
    pub fn to_route_spec(&self, name: &str) -> RouteSpec {
        RouteSpec {
            name: name.to_string(),
            host_name: self.hostname.clone(),
            user: self.user.clone(),
            port: self.port,
            target_patterns: self.target_addrs.clone(),
            use_local_broker: self.use_ssh_client,
        }
    }
}

fn default_listen_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Collect a table of tables into a vector, keeping the order the
/// deserializer yields entries in.
fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, ProxyEntry)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, ProxyEntry)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a table of proxy definitions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, entry)) = map.next_entry::<String, ProxyEntry>()? {
                entries.push((name, entry));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}
