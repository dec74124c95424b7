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

use super::list::path_label;
use crate::routing::RouteTable;
use crate::tunnel::SshConnector;

/// Report the route `domain` would be sent through.
///
/// Returns `false` when no route matches.
pub fn check_domain(routes: &RouteTable, connector: &SshConnector, domain: &str) -> bool {
    let route = match routes.select(domain) {
        Ok(route) => route,
        Err(e) => {
            println!("  {} {} - {}", "●".red(), domain.bold(), e.to_string().red());
            return false;
        }
    };

    let spec = route.spec();
    println!(
        "  {} {} - route {} {}",
        "●".green(),
        domain.bold(),
        spec.name.green().bold(),
        path_label(spec, connector).cyan()
    );
    if let Some(pattern) = route.matching_pattern(domain) {
        println!("    {} matched {}", "└".dimmed(), pattern.dimmed());
    }
    true
}
