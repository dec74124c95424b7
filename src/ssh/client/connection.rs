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

//! SSH connection establishment and forwarding channels.

use super::{ClientHandler, ConnectSettings, SshTarget};
use crate::error::{DialFailure, Error, Result};
use crate::ssh::auth::Authenticator;
use russh::client::{Handle, Msg};
use russh::ChannelStream;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Await `fut`, failing with [`DialFailure::Timeout`] once `limit` elapses.
///
/// `None` waits indefinitely.
pub async fn bounded<T, E, F>(limit: Option<Duration>, fut: F) -> std::result::Result<T, DialFailure>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<DialFailure>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(DialFailure::Timeout(limit)),
        },
        None => fut.await.map_err(Into::into),
    }
}

/// An authenticated SSH session.
///
/// Cloning shares the underlying session.
#[derive(Clone)]
pub struct Client {
    handle: Arc<Handle<ClientHandler>>,
    target: SshTarget,
    connect_timeout: Option<Duration>,
}

impl Client {
    /// Open a TCP connection to `target` and run SSH over it.
    pub async fn connect(
        target: &SshTarget,
        settings: &ConnectSettings,
        auth: &mut dyn Authenticator,
    ) -> Result<Self> {
        tracing::debug!("Connecting to {}", target);

        let stream = bounded(
            settings.connect_timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|e| Error::dial(target.address(), e))?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::trace!("Failed to set TCP_NODELAY: {}", e);
        }

        Self::connect_stream(stream, target, settings, auth).await
    }

    /// Run SSH over an already established byte stream.
    ///
    /// Used for hops reached through a forwarded channel of the previous hop.
    pub async fn connect_stream<S>(
        stream: S,
        target: &SshTarget,
        settings: &ConnectSettings,
        auth: &mut dyn Authenticator,
    ) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let handler = ClientHandler::new(target);
        let mut handle = bounded(
            settings.connect_timeout,
            russh::client::connect_stream(settings.russh_config(), stream, handler),
        )
        .await
        .map_err(|e| Error::dial(target.address(), e))?;

        if let Err(e) = bounded(
            settings.connect_timeout,
            auth.authenticate(&mut handle, &target.user),
        )
        .await
        {
            let _ = handle
                .disconnect(russh::Disconnect::ByApplication, "", "")
                .await;
            return Err(Error::dial(target.address(), e));
        }

        tracing::info!("SSH session established to {}", target);
        Ok(Self {
            handle: Arc::new(handle),
            target: target.clone(),
            connect_timeout: settings.connect_timeout,
        })
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Ask the server to connect to `host:port` and return the channel as a
    /// byte stream. The name is resolved on the remote side.
    pub async fn open_direct_tcpip_channel(
        &self,
        host: &str,
        port: u16,
    ) -> Result<ChannelStream<Msg>> {
        let channel = bounded(
            self.connect_timeout,
            self.handle
                .channel_open_direct_tcpip(host, u32::from(port), "127.0.0.1", 0),
        )
        .await
        .map_err(|e| Error::dial(format!("{host}:{port} via {}", self.target.alias), e))?;

        tracing::trace!(
            "Opened direct-tcpip channel to {}:{} via {}",
            host,
            port,
            self.target.alias
        );
        Ok(channel.into_stream())
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) {
        if self.handle.is_closed() {
            return;
        }
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
        {
            tracing::debug!("Error disconnecting from {}: {}", self.target.alias, e);
        }
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.target)
            .field("closed", &self.is_closed())
            .finish()
    }
}
