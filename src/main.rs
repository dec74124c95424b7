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

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use proxs::{
    cli::{Cli, Commands},
    commands::{check::check_domain, list::list_routes, serve::serve},
    config::{expand_tilde, Config},
    routing::RouteTable,
    ssh::{AgentCredentials, SshConfig},
    tunnel::SshConnector,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (mut config, source) = Config::load_with_priority(cli.config.as_deref()).await?;
    tracing::debug!("Loaded configuration from {:?}", source);

    // CLI values take precedence over the config file
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }

    let ssh_config_path = cli
        .ssh_config
        .as_deref()
        .map(expand_tilde)
        .or_else(|| config.ssh_config_path());
    let ssh_config = SshConfig::load(ssh_config_path.as_deref())
        .await
        .context("Failed to load SSH configuration")?;

    let credentials = match config.agent_socket_path() {
        Some(socket) => AgentCredentials::new(socket),
        None => AgentCredentials::from_env(),
    };
    if credentials.socket().is_none() {
        tracing::warn!("SSH_AUTH_SOCK is not set; tunnels will fail to authenticate");
    }

    let connector = Arc::new(SshConnector::new(
        credentials,
        Arc::new(ssh_config),
        config.connect_settings(),
    ));
    let routes = Arc::new(
        RouteTable::new(config.routes()).context("Invalid route configuration")?,
    );

    match cli.command() {
        Commands::Serve => {
            if config.strict_host_key_checking.is_disabled() {
                tracing::warn!(
                    "Host key verification is disabled; set strict_host_key_checking to \"accept-new\" or \"yes\" to verify gateways"
                );
            }
            if routes.is_empty() {
                tracing::warn!("No routes configured; every request will be refused");
            }
            let addr = SocketAddr::new(config.listen_address, config.port);
            serve(addr, routes, connector, config.max_connections).await
        }
        Commands::List => {
            list_routes(&routes, &connector);
            Ok(())
        }
        Commands::Check { domain } => {
            if !check_domain(&routes, &connector, &domain) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
