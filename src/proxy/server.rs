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

use super::session::{handle_connection, SessionContext};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn};

/// SOCKS5 listener dispatching each client to its own task
pub struct ProxyServer {
    listener: TcpListener,
    context: SessionContext,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl ProxyServer {
    /// Bind the listener.
    ///
    /// `max_connections` bounds concurrently served clients; extra clients
    /// wait for a slot after being accepted.
    pub async fn bind(
        addr: SocketAddr,
        context: SessionContext,
        max_connections: Option<usize>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind SOCKS5 listener to {addr}"))?;

        Ok(Self {
            listener,
            context,
            connection_semaphore: max_connections.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to get local address for SOCKS5 listener")
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Accept clients until the context's cancellation token fires, then
    /// tear down every active tunnel.
    pub async fn run(self) -> Result<()> {
        info!("SOCKS5 proxy listening on {}", self.local_addr()?);
        let cancel = self.context.cancel.clone();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            trace!("Accepted SOCKS connection from {}", peer_addr);
                            self.context.stats.inc_accepted();
                            self.spawn_session(stream, peer_addr);
                        }
                        Err(e) => {
                            error!("Failed to accept SOCKS connection: {}", e);
                            // Brief pause to avoid busy loop on persistent errors
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("Proxy cancelled, stopping listener");
                    break;
                }
            }
        }

        self.context.routes.shutdown().await;
        info!(
            "SOCKS5 proxy stopped: {} sessions served, {} failed, {} bytes relayed",
            self.context.stats.total_accepted(),
            self.context.stats.total_failed(),
            self.context.stats.bytes_transferred()
        );
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let context = self.context.clone();
        let semaphore = self.connection_semaphore.clone();

        tokio::spawn(async move {
            let _permit = match semaphore {
                Some(ref semaphore) => match semaphore.acquire().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!("Failed to acquire connection permit for {}", peer_addr);
                        return;
                    }
                },
                None => None,
            };

            if let Err(e) = stream.set_nodelay(true) {
                trace!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
            }

            context.stats.inc_active();
            let result = handle_connection(stream, &context).await;
            context.stats.dec_active();

            match result {
                Ok(summary) => info!(
                    "{} {} via '{}' closed: {} bytes sent, {} bytes received",
                    peer_addr,
                    summary.request.target(),
                    summary.route,
                    summary.bytes_sent,
                    summary.bytes_received
                ),
                Err(e) => {
                    context.stats.inc_failed();
                    warn!("Session from {} failed: {}", peer_addr, e);
                }
            }
        });
    }
}
