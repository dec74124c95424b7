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

//! Bidirectional byte relay between a SOCKS client and a dialed upstream.
//!
//! # Architecture
//!
//! Two directions run concurrently:
//! - **Client→Upstream**: reads the inbound socket, writes the tunnel stream
//! - **Upstream→Client**: reads the tunnel stream, writes the inbound socket
//!
//! The first direction to reach EOF shuts down the write half of its peer and
//! ends the relay; both streams are then dropped, which closes the other
//! endpoint even when it has gone idle. A peer that went away, whether seen
//! on read or on write, counts as EOF. Any other I/O error ends both
//! directions with that error.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Byte counters for one relayed session
#[derive(Debug)]
pub struct RelayStats {
    pub bytes_client_to_upstream: AtomicU64,
    pub bytes_upstream_to_client: AtomicU64,
    pub started_at: Instant,
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            bytes_client_to_upstream: AtomicU64::new(0),
            bytes_upstream_to_client: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn sent(&self) -> u64 {
        self.bytes_client_to_upstream.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.bytes_upstream_to_client.load(Ordering::Relaxed)
    }

    /// Get total bytes transferred in both directions
    pub fn total_bytes(&self) -> u64 {
        self.sent() + self.received()
    }

    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// How a relay ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// One side closed and the other was closed in turn
    Closed,
    /// The cancellation token fired first
    Cancelled,
}

/// Copy bytes both ways between `client` and `upstream` until either side
/// closes, an I/O error occurs, or `cancel` fires.
pub async fn relay<C, U>(
    client: C,
    upstream: U,
    stats: &RelayStats,
    cancel: &CancellationToken,
) -> io::Result<RelayEnd>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let outbound = pipe(
        &mut client_read,
        &mut upstream_write,
        &stats.bytes_client_to_upstream,
        "client→upstream",
    );
    let inbound = pipe(
        &mut upstream_read,
        &mut client_write,
        &stats.bytes_upstream_to_client,
        "upstream→client",
    );

    tokio::pin!(outbound, inbound);

    let end = tokio::select! {
        result = &mut outbound => {
            result?;
            trace!("Client closed, closing upstream");
            RelayEnd::Closed
        }
        result = &mut inbound => {
            result?;
            trace!("Upstream closed, closing client");
            RelayEnd::Closed
        }
        _ = cancel.cancelled() => {
            trace!("Relay cancelled");
            RelayEnd::Cancelled
        }
    };

    debug!(
        "Relay finished ({:?}): {} bytes sent, {} bytes received in {:?}",
        end,
        stats.sent(),
        stats.received(),
        stats.duration()
    );
    Ok(end)
}

async fn pipe<R, W>(
    reader: &mut R,
    writer: &mut W,
    counter: &AtomicU64,
    direction: &'static str,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_disconnect(&e) => {
                trace!("{} closed: {}", direction, e);
                break;
            }
            Err(e) => return Err(e),
        };
        match writer.write_all(&buffer[..n]).await {
            Ok(()) => {}
            Err(e) if is_disconnect(&e) => {
                trace!("{} peer went away: {}", direction, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    trace!("{} reached EOF", direction);
    match writer.shutdown().await {
        Err(e) if !is_disconnect(&e) => Err(e),
        _ => Ok(()),
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}
