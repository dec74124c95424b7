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

use super::route::{Route, RouteSpec};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{trace, warn};

/// Routes in configuration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Build the table, compiling every pattern up front.
    pub fn new(specs: impl IntoIterator<Item = RouteSpec>) -> Result<Self> {
        let routes = specs
            .into_iter()
            .map(|spec| {
                if spec.target_patterns.is_empty() {
                    warn!("Route '{}' has no target patterns and never matches", spec.name);
                }
                Route::new(spec).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { routes })
    }

    /// First route, in configuration order, with a pattern matching `domain`.
    pub fn select(&self, domain: &str) -> Result<Arc<Route>> {
        let route = self
            .routes
            .iter()
            .find(|route| route.matches(domain))
            .ok_or_else(|| Error::NoMatchingRoute(domain.to_string()))?;
        trace!("{} -> route '{}'", domain, route.name());
        Ok(Arc::clone(route))
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|route| route.name() == name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Tear down every active tunnel.
    pub async fn shutdown(&self) {
        for route in &self.routes {
            route.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, patterns: &[&str]) -> RouteSpec {
        RouteSpec {
            name: name.to_string(),
            host_name: format!("{name}-gw"),
            user: None,
            port: None,
            target_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            use_local_broker: false,
        }
    }

    #[test]
    fn test_first_route_in_order_wins() {
        let table = RouteTable::new(vec![
            spec("narrow", &["db.corp.example.com"]),
            spec("wide", &["*.example.com"]),
        ])
        .unwrap();

        assert_eq!(table.select("db.corp.example.com").unwrap().name(), "narrow");
        assert_eq!(table.select("web.example.com").unwrap().name(), "wide");
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::new(vec![spec("wide", &["*.example.com"])]).unwrap();
        let err = table.select("example.org").unwrap_err();
        assert!(matches!(err, Error::NoMatchingRoute(ref d) if d == "example.org"));
    }

    #[test]
    fn test_empty_table_matches_nothing() {
        let table = RouteTable::default();
        assert!(table.is_empty());
        assert!(table.select("anything").is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let table = RouteTable::new(vec![spec("a", &["*"]), spec("b", &["*"])]).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.get("b").is_some());
        assert!(table.get("c").is_none());
    }
}
