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

use super::*;
use crate::ssh::known_hosts::StrictHostKeyChecking;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const FULL: &str = r#"
port = 1080
listen_address = "0.0.0.0"
connect_timeout = 15
keepalive_interval = 30
max_connections = 64
strict_host_key_checking = "accept-new"
ssh_config = "/etc/proxs/ssh_config"

[proxy.zeta]
hostname = "zeta-gw"
target_addrs = ["*.zeta.example.com"]

[proxy.alpha]
hostname = "alpha-gw"
user = "alice"
port = 2222
target_addrs = ["*.alpha.example.com", "git.internal"]

[proxy.broker]
hostname = "localhost"
port = 1081
target_patterns = ["*.vpn"]
use_local_broker = true
"#;

#[test]
fn test_parse_full_config() {
    let config = Config::parse(FULL).unwrap();

    assert_eq!(config.port, 1080);
    assert_eq!(config.listen_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.max_connections, Some(64));
    assert_eq!(
        config.strict_host_key_checking,
        StrictHostKeyChecking::AcceptNew
    );
    assert_eq!(
        config.ssh_config_path(),
        Some(PathBuf::from("/etc/proxs/ssh_config"))
    );

    let settings = config.connect_settings();
    assert_eq!(settings.connect_timeout, Some(Duration::from_secs(15)));
    assert_eq!(settings.keepalive_interval, Some(Duration::from_secs(30)));
}

#[test]
fn test_routes_follow_document_order() {
    let config = Config::parse(FULL).unwrap();
    let routes = config.routes();

    let names: Vec<_> = routes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "broker"]);

    assert_eq!(routes[1].user.as_deref(), Some("alice"));
    assert_eq!(routes[1].port, Some(2222));
    assert_eq!(routes[1].target_patterns.len(), 2);

    assert!(routes[2].use_local_broker);
    assert_eq!(routes[2].target_patterns, vec!["*.vpn"]);
}

#[test]
fn test_minimal_config_defaults() {
    let config = Config::parse("port = 9050\n").unwrap();
    assert_eq!(config.listen_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.connect_timeout, None);
    assert!(config.strict_host_key_checking.is_disabled());
    assert!(config.routes().is_empty());
    assert!(config.agent_socket_path().is_none());
}

#[test]
fn test_original_key_names() {
    let config = Config::parse(
        r#"
port = 1080
[proxy.home]
hostname = "127.0.0.1"
port = 1081
target_addrs = ["*.home"]
use_ssh_client = true
"#,
    )
    .unwrap();
    let routes = config.routes();
    assert!(routes[0].use_local_broker);
}

#[test]
fn test_missing_port_is_rejected() {
    assert!(Config::parse("[proxy.a]\nhostname = \"gw\"\n").is_err());
}

#[test]
fn test_broker_without_port_is_rejected() {
    let err = Config::parse(
        "port = 1080\n[proxy.b]\nhostname = \"localhost\"\nuse_ssh_client = true\n",
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("needs a port"));
}

#[test]
fn test_empty_hostname_is_rejected() {
    assert!(Config::parse("port = 1080\n[proxy.b]\nhostname = \"  \"\n").is_err());
}

#[test]
fn test_invalid_host_key_mode_is_rejected() {
    assert!(Config::parse("port = 1080\nstrict_host_key_checking = \"maybe\"\n").is_err());
}

#[tokio::test]
async fn test_load_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("proxs.toml");
    std::fs::write(&path, FULL).unwrap();

    let (config, source) = Config::load_with_priority(Some(&path)).await.unwrap();
    assert_eq!(source, path);
    assert_eq!(config.routes().len(), 3);
}

#[tokio::test]
async fn test_load_explicit_missing_path_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");
    assert!(Config::load_with_priority(Some(&missing)).await.is_err());
}
