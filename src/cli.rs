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

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "proxs",
    version,
    about = "Domain-routed SOCKS5 proxy over SSH tunnels",
    long_about = "proxs listens as a local SOCKS5 proxy and forwards every CONNECT request through an SSH tunnel.\nThe tunnel is chosen by matching the requested domain against each route's glob patterns in\nconfiguration order. Tunnels reach the destination directly, through ProxyJump hosts taken from\nthe SSH client configuration, or through a SOCKS5 broker already running locally.\nAuthentication uses the SSH agent.",
    after_help = "EXAMPLES:\n  Start the proxy:             proxs\n  Use another config file:     proxs -c ~/proxs.toml serve\n  Show configured routes:      proxs list\n  Check which route matches:   proxs check git.corp.example.com\n\nFor more information, see the README."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(
        short = 'c',
        long,
        env = "PROXS_CONFIG",
        help = "Configuration file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./config.toml)\n  3. User config (~/.config/proxs/config.toml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'F',
        long = "ssh-config",
        help = "Use alternative SSH configuration file\nOverrides the ssh_config setting; defaults to ~/.ssh/config"
    )]
    pub ssh_config: Option<PathBuf>,

    #[arg(short = 'p', long, help = "Listen port (overrides the config file)")]
    pub port: Option<u16>,

    #[arg(long, help = "Listen address (overrides the config file)")]
    pub listen: Option<IpAddr>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(
        about = "Run the SOCKS5 proxy (default)",
        long_about = "Binds the SOCKS5 listener and serves clients until interrupted.\nTunnels are opened on first use and closed when their last session ends."
    )]
    Serve,

    #[command(
        about = "List configured routes",
        long_about = "Prints every route in selection order with its gateway and target patterns."
    )]
    List,

    #[command(
        about = "Show which route a domain would use",
        long_about = "Runs route selection for DOMAIN without opening a tunnel.\n\nExit codes: 0 (a route matches), 1 (no route matches)"
    )]
    Check {
        #[arg(help = "Destination domain, e.g. git.corp.example.com")]
        domain: String,
    },
}

impl Cli {
    /// The subcommand to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
