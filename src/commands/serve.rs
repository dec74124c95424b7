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
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::proxy::{ProxyServer, SessionContext};
use crate::routing::RouteTable;
use crate::tunnel::Connector;

/// Serve SOCKS5 clients on `addr` until SIGINT or SIGTERM.
pub async fn serve(
    addr: SocketAddr,
    routes: Arc<RouteTable>,
    connector: Arc<dyn Connector>,
    max_connections: Option<usize>,
) -> Result<()> {
    let context = SessionContext::new(routes, connector);
    let server = ProxyServer::bind(addr, context, max_connections).await?;

    let shutdown = shutdown_signal()?;
    let cancel = server.context().cancel.clone();
    tokio::spawn(watch_shutdown(shutdown, cancel));

    server.run().await
}

async fn watch_shutdown(
    shutdown: impl std::future::Future<Output = ()>,
    cancel: CancellationToken,
) {
    shutdown.await;
    tracing::info!("Shutting down, closing active tunnels");
    cancel.cancel();
}

/// Future resolving on the first SIGINT or SIGTERM
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal;

    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    Ok(async move {
        #[cfg(unix)]
        let terminate = terminate.recv();
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("Received SIGINT (Ctrl+C)"),
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
            },
            _ = terminate => {
                tracing::info!("Received SIGTERM");
            }
        }
    })
}
