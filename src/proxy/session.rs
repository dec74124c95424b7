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

//! One SOCKS client connection from handshake to teardown.

use super::stats::ProxyStats;
use crate::error::{Error, Result};
use crate::routing::RouteTable;
use crate::socks::{self, ConnectRequest};
use crate::tunnel::{relay, Connector, RelayEnd, RelayStats};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything a session needs, shared by all sessions of a server.
#[derive(Clone)]
pub struct SessionContext {
    pub routes: Arc<RouteTable>,
    pub connector: Arc<dyn Connector>,
    pub stats: Arc<ProxyStats>,
    pub cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(routes: Arc<RouteTable>, connector: Arc<dyn Connector>) -> Self {
        Self {
            routes,
            connector,
            stats: Arc::new(ProxyStats::default()),
            cancel: CancellationToken::new(),
        }
    }
}

/// Outcome of a session that reached the relay
#[derive(Debug)]
pub struct SessionSummary {
    pub request: ConnectRequest,
    pub route: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub end: RelayEnd,
}

/// Serve one client: handshake, route selection, activation, dial, relay.
///
/// The route's lease is returned whenever activation succeeded, including
/// when the dial fails. `stream` is dropped, and so closed, on return.
pub async fn handle_connection<S>(mut stream: S, ctx: &SessionContext) -> Result<SessionSummary>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = socks::accept(&mut stream).await?;
    let route = ctx.routes.select(&request.host)?;
    debug!("{} selected route '{}'", request.target(), route.name());

    let client = route.activate(ctx.connector.as_ref()).await?;

    let upstream = match client.dial(&request.host, request.port).await {
        Ok(upstream) => upstream,
        Err(e) => {
            route.deactivate().await;
            return Err(e);
        }
    };
    drop(client);

    let relay_stats = RelayStats::new();
    let result = relay(stream, upstream, &relay_stats, &ctx.cancel).await;
    route.deactivate().await;

    ctx.stats.add_bytes(relay_stats.total_bytes());
    let end = result.map_err(Error::Relay)?;

    Ok(SessionSummary {
        route: route.name().to_string(),
        request,
        bytes_sent: relay_stats.sent(),
        bytes_received: relay_stats.received(),
        end,
    })
}
