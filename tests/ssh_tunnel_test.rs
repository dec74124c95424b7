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

//! SSH tunnels against in-process russh servers that forward `direct-tcpip`
//! channels to local TCP ports.

use async_trait::async_trait;
use proxs::error::DialFailure;
use proxs::proxy::{ProxyServer, SessionContext};
use proxs::routing::{Route, RouteSpec, RouteTable};
use proxs::ssh::{
    Authenticator, Client, ClientHandler, ConnectSettings, Credentials, SshConfig, SshTarget,
    StrictHostKeyChecking,
};
use proxs::tunnel::{Cleanup, SshConnector};
use proxs::{Error, Result};
use russh::client::Handle;
use russh::keys::{Algorithm, PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use russh::server::{Auth, Msg, Session};
use russh::Channel;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_socks::tcp::Socks5Stream;

const REJECTED_USER: &str = "intruder";

#[derive(Clone, Default)]
struct Counters {
    /// Successful publickey authentications
    handshakes: Arc<AtomicUsize>,
    /// Sessions whose handler is still alive
    live: Arc<AtomicUsize>,
}

impl Counters {
    fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn wait_until_idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.live() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("SSH sessions were never released");
    }
}

struct ForwardingServer {
    counters: Counters,
}

impl russh::server::Server for ForwardingServer {
    type Handler = ForwardingHandler;

    fn new_client(&mut self, _peer_addr: Option<SocketAddr>) -> Self::Handler {
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        ForwardingHandler {
            counters: self.counters.clone(),
        }
    }
}

/// Accepts any key except for [`REJECTED_USER`] and forwards every
/// `direct-tcpip` channel to the requested address.
struct ForwardingHandler {
    counters: Counters,
}

impl Drop for ForwardingHandler {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl russh::server::Handler for ForwardingHandler {
    type Error = russh::Error;

    async fn auth_publickey(&mut self, user: &str, _key: &PublicKey) -> Result<Auth, Self::Error> {
        if user == REJECTED_USER {
            return Ok(Auth::reject());
        }
        self.counters.handshakes.fetch_add(1, Ordering::SeqCst);
        Ok(Auth::Accept)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        let Ok(port) = u16::try_from(port_to_connect) else {
            return Ok(false);
        };
        let Ok(mut upstream) = TcpStream::connect((host_to_connect, port)).await else {
            return Ok(false);
        };
        tokio::spawn(async move {
            let mut stream = Box::pin(channel.into_stream());
            let _ = tokio::io::copy_bidirectional(&mut stream, &mut upstream).await;
        });
        Ok(true)
    }
}

async fn spawn_ssh_server() -> (u16, Counters) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = Arc::new(russh::server::Config {
        keys: vec![PrivateKey::random(&mut rand::thread_rng(), Algorithm::Ed25519).unwrap()],
        auth_rejection_time: Duration::from_millis(10),
        auth_rejection_time_initial: Some(Duration::ZERO),
        ..Default::default()
    });
    let counters = Counters::default();
    let mut server = ForwardingServer {
        counters: counters.clone(),
    };
    tokio::spawn(async move {
        let _ = russh::server::Server::run_on_socket(&mut server, config, &listener).await;
    });
    (port, counters)
}

async fn spawn_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    port
}

async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Signs with one in-memory key
#[derive(Debug, Clone)]
struct KeyCredentials {
    key: Arc<PrivateKey>,
}

impl KeyCredentials {
    fn generate() -> Self {
        Self {
            key: Arc::new(PrivateKey::random(&mut rand::thread_rng(), Algorithm::Ed25519).unwrap()),
        }
    }
}

struct KeyAuthenticator {
    key: Arc<PrivateKey>,
}

#[async_trait]
impl Credentials for KeyCredentials {
    async fn open(&self) -> Result<Box<dyn Authenticator>> {
        Ok(Box::new(KeyAuthenticator {
            key: Arc::clone(&self.key),
        }))
    }
}

#[async_trait]
impl Authenticator for KeyAuthenticator {
    async fn authenticate(
        &mut self,
        handle: &mut Handle<ClientHandler>,
        user: &str,
    ) -> std::result::Result<(), DialFailure> {
        let hash = handle.best_supported_rsa_hash().await?.flatten();
        let result = handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::clone(&self.key), hash))
            .await?;
        if result.success() {
            Ok(())
        } else {
            Err(DialFailure::AuthRejected(user.to_string()))
        }
    }

    fn into_cleanup(self: Box<Self>) -> Cleanup {
        Box::new(|| {})
    }
}

fn settings() -> ConnectSettings {
    ConnectSettings {
        connect_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    }
}

fn target(port: u16, user: &str) -> SshTarget {
    SshTarget {
        alias: "local".to_string(),
        host: "127.0.0.1".to_string(),
        port,
        user: user.to_string(),
        host_key_check: StrictHostKeyChecking::No,
    }
}

fn connector(ssh_config: &str) -> SshConnector {
    SshConnector::new(
        KeyCredentials::generate(),
        Arc::new(SshConfig::parse(ssh_config).unwrap()),
        settings(),
    )
}

fn route(name: &str, host_name: &str, pattern: &str) -> RouteSpec {
    RouteSpec {
        name: name.to_string(),
        host_name: host_name.to_string(),
        user: None,
        port: None,
        target_patterns: vec![pattern.to_string()],
        use_local_broker: false,
    }
}

async fn echo_through<S>(stream: &mut S, payload: &[u8])
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    stream.write_all(payload).await.unwrap();
    let mut echoed = vec![0u8; payload.len()];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(echoed, payload);
}

#[tokio::test]
async fn test_client_connect_opens_forwarding_channel() {
    let (ssh_port, counters) = spawn_ssh_server().await;
    let echo_port = spawn_echo_server().await;
    let mut auth = KeyCredentials::generate().open().await.unwrap();

    let client = Client::connect(&target(ssh_port, "tester"), &settings(), &mut *auth)
        .await
        .unwrap();
    assert_eq!(counters.handshakes(), 1);

    let mut stream = client
        .open_direct_tcpip_channel("127.0.0.1", echo_port)
        .await
        .unwrap();
    echo_through(&mut stream, b"over ssh").await;
    drop(stream);

    client.disconnect().await;
    counters.wait_until_idle().await;
}

#[tokio::test]
async fn test_client_connect_rejected_user_is_dial_error() {
    let (ssh_port, counters) = spawn_ssh_server().await;
    let mut auth = KeyCredentials::generate().open().await.unwrap();

    let err = Client::connect(&target(ssh_port, REJECTED_USER), &settings(), &mut *auth)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Dial {
            source: DialFailure::AuthRejected(_),
            ..
        }
    ));
    assert_eq!(counters.handshakes(), 0);
    counters.wait_until_idle().await;
}

#[tokio::test]
async fn test_direct_route_handshakes_once_per_activation() {
    let (ssh_port, counters) = spawn_ssh_server().await;
    let echo_port = spawn_echo_server().await;
    let connector = connector(&format!(
        "Host direct\n    HostName 127.0.0.1\n    Port {ssh_port}\n    User tester\n"
    ));
    let route = Route::new(route("direct", "direct", "*")).unwrap();

    let first = route.activate(&connector).await.unwrap();
    let second = route.activate(&connector).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.kind(), "direct");
    assert_eq!(counters.handshakes(), 1);

    let mut stream = first.dial("127.0.0.1", echo_port).await.unwrap();
    echo_through(&mut stream, b"direct").await;
    drop(stream);

    route.deactivate().await;
    assert!(route.is_active().await);
    assert_eq!(counters.live(), 1);

    route.deactivate().await;
    assert!(!route.is_active().await);
    counters.wait_until_idle().await;

    // A fresh activation after teardown is a fresh handshake
    route.activate(&connector).await.unwrap();
    assert_eq!(counters.handshakes(), 2);
    route.shutdown().await;
    counters.wait_until_idle().await;
}

#[tokio::test]
async fn test_jump_route_relays_socks_session_end_to_end() {
    let (gw_port, gw) = spawn_ssh_server().await;
    let (dest_port, dest) = spawn_ssh_server().await;
    let echo_port = spawn_echo_server().await;

    let connector = Arc::new(connector(&format!(
        "Host gw\n    HostName 127.0.0.1\n    Port {gw_port}\n    User hopper\n\n\
         Host dest\n    HostName 127.0.0.1\n    Port {dest_port}\n    User tester\n    ProxyJump gw\n"
    )));
    let routes = Arc::new(RouteTable::new([route("jump", "dest", "127.0.0.*")]).unwrap());
    let context = SessionContext::new(Arc::clone(&routes), connector);
    let cancel = context.cancel.clone();

    let server = ProxyServer::bind("127.0.0.1:0".parse().unwrap(), context, None)
        .await
        .unwrap();
    let proxy_addr = server.local_addr().unwrap();
    let server_task = tokio::spawn(server.run());

    let mut client = Socks5Stream::connect(proxy_addr, ("127.0.0.1", echo_port))
        .await
        .unwrap();
    echo_through(&mut client, b"two hops away").await;

    let route = routes.get("jump").unwrap();
    assert_eq!(route.lease_count().await, 1);
    assert_eq!(gw.handshakes(), 1);
    assert_eq!(dest.handshakes(), 1);

    drop(client);
    dest.wait_until_idle().await;
    gw.wait_until_idle().await;
    assert!(!route.is_active().await);

    cancel.cancel();
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_jump_chain_dials_through_destination() {
    let (gw_port, gw) = spawn_ssh_server().await;
    let (dest_port, dest) = spawn_ssh_server().await;
    let echo_port = spawn_echo_server().await;
    let connector = connector(&format!(
        "Host gw\n    HostName 127.0.0.1\n    Port {gw_port}\n    User hopper\n\n\
         Host dest\n    HostName 127.0.0.1\n    Port {dest_port}\n    User tester\n    ProxyJump gw\n"
    ));
    let route = Route::new(route("jump", "dest", "*")).unwrap();

    let client = route.activate(&connector).await.unwrap();
    assert_eq!(client.kind(), "jump");

    let mut first = client.dial("127.0.0.1", echo_port).await.unwrap();
    let mut second = client.dial("127.0.0.1", echo_port).await.unwrap();
    echo_through(&mut first, b"first").await;
    echo_through(&mut second, b"second").await;
    assert_eq!(gw.handshakes(), 1);
    assert_eq!(dest.handshakes(), 1);
    drop(first);
    drop(second);

    route.deactivate().await;
    dest.wait_until_idle().await;
    gw.wait_until_idle().await;
}

#[tokio::test]
async fn test_failed_final_hop_releases_jump_sessions() {
    let (gw_port, gw) = spawn_ssh_server().await;
    let dead_port = unused_port().await;
    let connector = connector(&format!(
        "Host gw\n    HostName 127.0.0.1\n    Port {gw_port}\n    User hopper\n\n\
         Host broken\n    HostName 127.0.0.1\n    Port {dead_port}\n    User tester\n    ProxyJump gw\n"
    ));
    let route = Route::new(route("broken", "broken", "*")).unwrap();

    let err = route.activate(&connector).await.unwrap_err();
    assert!(matches!(err, Error::Dial { .. }));
    assert!(!route.is_active().await);

    // The jump session was authenticated, then released
    assert_eq!(gw.handshakes(), 1);
    gw.wait_until_idle().await;
}
