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

use crate::error::{Error, Result};
use crate::jump::JumpConnection;
use crate::ssh::client::{bounded, Client};
use russh::client::Msg;
use russh::ChannelStream;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

/// A live transport able to reach destinations on behalf of a route.
#[derive(Debug)]
pub enum TunnelClient {
    /// One SSH session straight to the route host
    Direct(Client),
    /// SSH session reached through one or more jump hosts
    JumpChained(JumpConnection),
    /// Local SOCKS5 broker; every dial is a fresh broker connection
    LocalBroker {
        proxy_addr: String,
        connect_timeout: Option<Duration>,
    },
}

impl TunnelClient {
    pub fn kind(&self) -> &'static str {
        match self {
            TunnelClient::Direct(_) => "direct",
            TunnelClient::JumpChained(_) => "jump",
            TunnelClient::LocalBroker { .. } => "broker",
        }
    }

    /// Open a byte stream to `host:port` through this tunnel.
    ///
    /// For SSH tunnels `host` is resolved by the remote side.
    pub async fn dial(&self, host: &str, port: u16) -> Result<TunnelStream> {
        match self {
            TunnelClient::Direct(client) => {
                let stream = client.open_direct_tcpip_channel(host, port).await?;
                Ok(TunnelStream::Channel(Box::pin(stream)))
            }
            TunnelClient::JumpChained(connection) => {
                let stream = connection
                    .client
                    .open_direct_tcpip_channel(host, port)
                    .await?;
                Ok(TunnelStream::Channel(Box::pin(stream)))
            }
            TunnelClient::LocalBroker {
                proxy_addr,
                connect_timeout,
            } => {
                let stream = bounded(
                    *connect_timeout,
                    Socks5Stream::connect(proxy_addr.as_str(), (host, port)),
                )
                .await
                .map_err(|e| Error::dial(format!("{host}:{port} via {proxy_addr}"), e))?;
                Ok(TunnelStream::Socks(Box::pin(stream)))
            }
        }
    }

    /// Release every session held by this client.
    pub async fn close(&self) {
        match self {
            TunnelClient::Direct(client) => client.disconnect().await,
            TunnelClient::JumpChained(connection) => connection.disconnect().await,
            TunnelClient::LocalBroker { .. } => {}
        }
    }
}

impl fmt::Display for TunnelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelClient::Direct(client) => write!(f, "direct {}", client.target()),
            TunnelClient::JumpChained(connection) => write!(
                f,
                "{} via {} jump host(s)",
                connection.client.target(),
                connection.jumps.len()
            ),
            TunnelClient::LocalBroker { proxy_addr, .. } => write!(f, "broker {proxy_addr}"),
        }
    }
}

/// Stream returned by [`TunnelClient::dial`].
pub enum TunnelStream {
    Channel(Pin<Box<ChannelStream<Msg>>>),
    Socks(Pin<Box<Socks5Stream<TcpStream>>>),
}

impl fmt::Debug for TunnelStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelStream::Channel(_) => f.write_str("TunnelStream::Channel"),
            TunnelStream::Socks(_) => f.write_str("TunnelStream::Socks"),
        }
    }
}

impl AsyncRead for TunnelStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TunnelStream::Channel(s) => s.as_mut().poll_read(cx, buf),
            TunnelStream::Socks(s) => s.as_mut().poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TunnelStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            TunnelStream::Channel(s) => s.as_mut().poll_write(cx, buf),
            TunnelStream::Socks(s) => s.as_mut().poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TunnelStream::Channel(s) => s.as_mut().poll_flush(cx),
            TunnelStream::Socks(s) => s.as_mut().poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            TunnelStream::Channel(s) => s.as_mut().poll_shutdown(cx),
            TunnelStream::Socks(s) => s.as_mut().poll_shutdown(cx),
        }
    }
}
