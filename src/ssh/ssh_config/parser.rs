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

//! SSH configuration parsing functionality
//!
//! Converts the OpenSSH text format into [`SshHostConfig`] blocks. Options
//! that appear before the first `Host` line form an implicit `Host *` block.

use super::types::SshHostConfig;
use anyhow::{Context, Result};

/// Parse SSH configuration content
pub(super) fn parse(content: &str) -> Result<Vec<SshHostConfig>> {
    let mut hosts = Vec::new();
    let mut current = SshHostConfig {
        host_patterns: vec!["*".to_string()],
        ..Default::default()
    };
    // Lines inside a `Match` block are not evaluated
    let mut in_match = false;

    for (index, raw) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((keyword, args)) = split_keyword(line) else {
            continue;
        };

        match keyword.as_str() {
            "host" => {
                if args.is_empty() {
                    anyhow::bail!(
                        "Host directive requires at least one pattern at line {line_number}"
                    );
                }
                hosts.push(std::mem::take(&mut current));
                current = SshHostConfig {
                    host_patterns: args.iter().map(|s| s.to_string()).collect(),
                    line_number,
                    ..Default::default()
                };
                in_match = false;
            }
            "match" => {
                tracing::debug!("Skipping Match block at line {}", line_number);
                in_match = true;
            }
            _ if in_match => {}
            _ => parse_option(&mut current, &keyword, &args, line_number)
                .with_context(|| format!("Error at line {line_number}: {line}"))?,
        }
    }

    hosts.push(current);

    // Drop the implicit global block when nothing was set in it
    hosts.retain(|host| {
        host.line_number != 0
            || host.hostname.is_some()
            || host.user.is_some()
            || host.port.is_some()
            || host.proxy_jump.is_some()
            || host.strict_host_key_checking.is_some()
    });

    Ok(hosts)
}

/// Split `Keyword value...` or `Keyword=value...` into a lowercase keyword and
/// its whitespace-separated arguments.
fn split_keyword(line: &str) -> Option<(String, Vec<&str>)> {
    let key_end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let keyword = &line[..key_end];
    if keyword.is_empty() {
        return None;
    }

    let rest = line[key_end..].trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    let args = rest.split_whitespace().collect();

    Some((keyword.to_lowercase(), args))
}

/// Parse a configuration option for a host
///
/// The first value seen for a keyword within a block is kept.
fn parse_option(
    host: &mut SshHostConfig,
    keyword: &str,
    args: &[&str],
    line_number: usize,
) -> Result<()> {
    let first = |name: &str| -> Result<String> {
        args.first()
            .map(|s| s.to_string())
            .with_context(|| format!("{name} requires a value at line {line_number}"))
    };

    match keyword {
        "hostname" => {
            let value = first("HostName")?;
            host.hostname.get_or_insert(value);
        }
        "user" => {
            let value = first("User")?;
            host.user.get_or_insert(value);
        }
        "port" => {
            let value = first("Port")?;
            let port: u16 = value.parse().with_context(|| {
                format!("Invalid port number '{value}' at line {line_number}")
            })?;
            host.port.get_or_insert(port);
        }
        "proxyjump" => {
            if args.is_empty() {
                anyhow::bail!("ProxyJump requires a value at line {line_number}");
            }
            host.proxy_jump.get_or_insert(args.join(""));
        }
        "stricthostkeychecking" => {
            let value = first("StrictHostKeyChecking")?;
            host.strict_host_key_checking.get_or_insert(value);
        }
        other => {
            tracing::trace!("Ignoring option '{}' at line {}", other, line_number);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equals_syntax() {
        let hosts = parse("Host gw\n  HostName=10.0.0.1\n  Port = 2200\n").unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].hostname.as_deref(), Some("10.0.0.1"));
        assert_eq!(hosts[0].port, Some(2200));
    }

    #[test]
    fn test_global_options_become_wildcard_block() {
        let hosts = parse("User everyone\n\nHost gw\n  Port 2200\n").unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].host_patterns, vec!["*"]);
        assert_eq!(hosts[0].user.as_deref(), Some("everyone"));
        assert_eq!(hosts[1].host_patterns, vec!["gw"]);
    }

    #[test]
    fn test_match_block_is_skipped() {
        let content = "Match host foo\n  User ignored\nHost gw\n  User kept\n";
        let hosts = parse(content).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].user.as_deref(), Some("kept"));
    }

    #[test]
    fn test_first_value_within_block_wins() {
        let hosts = parse("Host gw\n  User first\n  User second\n").unwrap();
        assert_eq!(hosts[0].user.as_deref(), Some("first"));
    }

    #[test]
    fn test_comma_separated_proxy_jump() {
        let hosts = parse("Host db\n  ProxyJump a, b\n").unwrap();
        assert_eq!(hosts[0].proxy_jump.as_deref(), Some("a,b"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = parse("Host gw\n  Port http\n").unwrap_err();
        assert!(format!("{err:#}").contains("Invalid port number"));
    }

    #[test]
    fn test_host_without_pattern_is_rejected() {
        assert!(parse("Host\n").is_err());
    }
}
