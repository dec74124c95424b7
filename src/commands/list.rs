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

use owo_colors::OwoColorize;

use crate::routing::{RouteSpec, RouteTable};
use crate::tunnel::SshConnector;

/// Print routes in selection order with the path each one resolves to.
pub fn list_routes(routes: &RouteTable, connector: &SshConnector) {
    if routes.is_empty() {
        println!("{}", "No routes configured".dimmed());
        return;
    }

    println!("\n{} {}\n", "▶".cyan(), "Configured routes".bold());
    for (index, route) in routes.routes().iter().enumerate() {
        let spec = route.spec();
        let count = spec.target_patterns.len();
        println!(
            "  {} {} {} ({} {})",
            format!("{}.", index + 1).dimmed(),
            spec.name.bold(),
            path_label(spec, connector).cyan(),
            count.to_string().yellow(),
            if count == 1 { "pattern" } else { "patterns" }
        );
        for pattern in &spec.target_patterns {
            println!("    {} {}", "•".dimmed(), pattern.dimmed());
        }
    }
    println!();
}

/// Short description of how a route reaches its destinations
pub(crate) fn path_label(spec: &RouteSpec, connector: &SshConnector) -> String {
    if spec.use_local_broker {
        return match spec.port {
            Some(port) => format!("via broker {}:{}", spec.host_name, port),
            None => format!("via broker {}", spec.host_name),
        };
    }
    match connector.resolve_chain(spec) {
        Ok(chain) => format!("via {chain}"),
        Err(e) => format!("via {} (unresolved: {})", spec.host_name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::{AgentCredentials, ConnectSettings, SshConfig};
    use std::sync::Arc;

    fn connector(ssh_config: &str) -> SshConnector {
        SshConnector::new(
            AgentCredentials::default(),
            Arc::new(SshConfig::parse(ssh_config).unwrap()),
            ConnectSettings::default(),
        )
    }

    fn spec(host_name: &str, broker: bool, port: Option<u16>) -> RouteSpec {
        RouteSpec {
            name: "r".to_string(),
            host_name: host_name.to_string(),
            user: None,
            port,
            target_patterns: vec!["*".to_string()],
            use_local_broker: broker,
        }
    }

    #[test]
    fn test_path_label_for_broker() {
        let connector = connector("");
        assert_eq!(
            path_label(&spec("localhost", true, Some(1081)), &connector),
            "via broker localhost:1081"
        );
    }

    #[test]
    fn test_path_label_for_jump_chain() {
        let connector = connector(
            "Host gw\n  User alice\nHost inner\n  User bob\n  ProxyJump gw\n",
        );
        assert_eq!(
            path_label(&spec("inner", false, None), &connector),
            "via gw -> inner"
        );
    }

    #[test]
    fn test_path_label_reports_unresolved_route() {
        let connector = connector("");
        let label = path_label(&spec("nouser", false, None), &connector);
        assert!(label.starts_with("via nouser (unresolved:"));
    }
}
