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

//! ProxyJump specification parsing

use anyhow::{Context, Result};
use std::fmt;

/// Maximum number of hops accepted in one ProxyJump chain
pub const MAX_JUMP_HOSTS: usize = 10;

/// A single jump host specification
///
/// Supports the format: `[user@]hostname[:port]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JumpHost {
    /// Username (None means take it from the SSH config)
    pub user: Option<String>,
    /// Hostname, IP address or SSH config alias
    pub host: String,
    /// SSH port (None means take it from the SSH config or use 22)
    pub port: Option<u16>,
}

impl JumpHost {
    pub fn new(host: String, user: Option<String>, port: Option<u16>) -> Self {
        Self { user, host, port }
    }
}

impl fmt::Display for JumpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref user) = self.user {
            write!(f, "{user}@")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Parse a ProxyJump value into its hops
///
/// `none` (any case) and the empty string mean "no jump".
///
/// # Examples
/// ```rust
/// use proxs::jump::parse_jump_hosts;
///
/// let jumps = parse_jump_hosts("admin@bastion:2222,inner").unwrap();
/// assert_eq!(jumps.len(), 2);
/// assert_eq!(jumps[0].user.as_deref(), Some("admin"));
/// assert_eq!(jumps[0].port, Some(2222));
/// assert_eq!(jumps[1].host, "inner");
/// ```
pub fn parse_jump_hosts(jump_spec: &str) -> Result<Vec<JumpHost>> {
    let jump_spec = jump_spec.trim();
    if jump_spec.is_empty() || jump_spec.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }

    let mut jump_hosts = Vec::new();
    for host_spec in jump_spec.split(',').map(str::trim) {
        if host_spec.is_empty() {
            continue;
        }
        let jump_host = parse_single_jump_host(host_spec)
            .with_context(|| format!("Failed to parse jump host specification: '{host_spec}'"))?;
        jump_hosts.push(jump_host);
    }

    if jump_hosts.is_empty() {
        anyhow::bail!("No valid jump hosts found in specification: '{jump_spec}'");
    }
    if jump_hosts.len() > MAX_JUMP_HOSTS {
        anyhow::bail!(
            "Too many jump hosts specified: {} (maximum allowed: {})",
            jump_hosts.len(),
            MAX_JUMP_HOSTS
        );
    }

    Ok(jump_hosts)
}

/// Parse a single `[user@]hostname[:port]`
pub fn parse_single_jump_host(host_spec: &str) -> Result<JumpHost> {
    if host_spec.is_empty() {
        anyhow::bail!("Empty jump host specification");
    }

    let (user, host_port) = match host_spec.rsplit_once('@') {
        Some((user, rest)) => {
            if user.is_empty() {
                anyhow::bail!("Empty username in '{host_spec}'");
            }
            (Some(user.to_string()), rest)
        }
        None => (None, host_spec),
    };

    let (host, port) = parse_host_port(host_port)
        .with_context(|| format!("Invalid host:port specification: '{host_port}'"))?;

    Ok(JumpHost::new(host, user, port))
}

/// Parse `hostname[:port]`, also accepting `[ipv6]` and `[ipv6]:port`
pub fn parse_host_port(host_port: &str) -> Result<(String, Option<u16>)> {
    if host_port.is_empty() {
        anyhow::bail!("Empty host specification");
    }

    if let Some(rest) = host_port.strip_prefix('[') {
        let (addr, remaining) = rest
            .split_once(']')
            .context("Unclosed bracket in IPv6 address")?;
        if addr.is_empty() {
            anyhow::bail!("Empty IPv6 address in brackets");
        }
        return match remaining {
            "" => Ok((addr.to_string(), None)),
            _ => match remaining.strip_prefix(':') {
                Some(port) => Ok((addr.to_string(), Some(parse_port(port)?))),
                None => anyhow::bail!("Invalid characters after IPv6 address: '{remaining}'"),
            },
        };
    }

    match host_port.rsplit_once(':') {
        // Bare IPv6 without brackets carries no port
        Some((host, _)) if host.contains(':') => Ok((host_port.to_string(), None)),
        Some((host, port)) => {
            if host.is_empty() {
                anyhow::bail!("Empty hostname");
            }
            Ok((host.to_string(), Some(parse_port(port)?)))
        }
        None => Ok((host_port.to_string(), None)),
    }
}

fn parse_port(port: &str) -> Result<u16> {
    if port.is_empty() {
        anyhow::bail!("Empty port specification");
    }
    let port: u16 = port
        .parse()
        .with_context(|| format!("Invalid port number: '{port}'"))?;
    if port == 0 {
        anyhow::bail!("Port number cannot be zero");
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_host_variants() {
        let host = parse_single_jump_host("bastion").unwrap();
        assert_eq!(host, JumpHost::new("bastion".to_string(), None, None));

        let host = parse_single_jump_host("ops@bastion:2222").unwrap();
        assert_eq!(host.user.as_deref(), Some("ops"));
        assert_eq!(host.host, "bastion");
        assert_eq!(host.port, Some(2222));
    }

    #[test]
    fn test_parse_ipv6() {
        let host = parse_single_jump_host("root@[::1]:2200").unwrap();
        assert_eq!(host.host, "::1");
        assert_eq!(host.port, Some(2200));

        let (host, port) = parse_host_port("fe80::1").unwrap();
        assert_eq!(host, "fe80::1");
        assert_eq!(port, None);
    }

    #[test]
    fn test_parse_chain_and_none() {
        let hops = parse_jump_hosts("a, b:2022 ,c@d").unwrap();
        assert_eq!(hops.len(), 3);
        assert_eq!(hops[1].port, Some(2022));
        assert_eq!(hops[2].user.as_deref(), Some("c"));

        assert!(parse_jump_hosts("none").unwrap().is_empty());
        assert!(parse_jump_hosts("NONE").unwrap().is_empty());
        assert!(parse_jump_hosts("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_ports() {
        assert!(parse_single_jump_host("bastion:0").is_err());
        assert!(parse_single_jump_host("bastion:ssh").is_err());
        assert!(parse_single_jump_host("bastion:").is_err());
        assert!(parse_single_jump_host("@bastion").is_err());
    }

    #[test]
    fn test_parse_rejects_long_chains() {
        let spec = (0..=MAX_JUMP_HOSTS)
            .map(|i| format!("hop{i}"))
            .collect::<Vec<_>>()
            .join(",");
        assert!(parse_jump_hosts(&spec).is_err());
    }

    #[test]
    fn test_display() {
        let host = JumpHost::new("::1".to_string(), Some("u".to_string()), Some(22));
        assert_eq!(host.to_string(), "u@[::1]:22");
    }
}
