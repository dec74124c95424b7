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

//! Configuration resolution for SSH configuration
//!
//! Blocks are applied in file order and, as in OpenSSH, the first block that
//! sets a keyword fixes its value.

use super::pattern::matches_host_patterns;
use super::types::SshHostConfig;

/// Find the effective configuration for `alias`
pub(super) fn find_host_config(hosts: &[SshHostConfig], alias: &str) -> SshHostConfig {
    let mut merged = SshHostConfig {
        host_patterns: vec![alias.to_string()],
        ..Default::default()
    };

    for host in hosts
        .iter()
        .filter(|host| matches_host_patterns(alias, &host.host_patterns))
    {
        tracing::trace!("{} matched block at line {}", alias, host.line_number);
        fill_unset(&mut merged, host);
    }

    if let Some(hostname) = merged.hostname.take() {
        merged.hostname = Some(expand_hostname_tokens(&hostname, alias));
    }

    merged
}

/// Copy every field `base` does not have yet from `block`
fn fill_unset(base: &mut SshHostConfig, block: &SshHostConfig) {
    if base.hostname.is_none() {
        base.hostname = block.hostname.clone();
    }
    if base.user.is_none() {
        base.user = block.user.clone();
    }
    if base.port.is_none() {
        base.port = block.port;
    }
    if base.proxy_jump.is_none() {
        base.proxy_jump = block.proxy_jump.clone();
    }
    if base.strict_host_key_checking.is_none() {
        base.strict_host_key_checking = block.strict_host_key_checking.clone();
    }
}

/// Expand `%h` (the alias) and `%%` in a `HostName` value
pub(super) fn expand_hostname_tokens(value: &str, alias: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('h') => out.push_str(alias),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}
