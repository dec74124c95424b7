pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod jump;
pub mod proxy;
pub mod routing;
pub mod socks;
pub mod ssh;
pub mod tunnel;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use error::{Error, Result};
pub use proxy::ProxyServer;
pub use routing::RouteTable;
