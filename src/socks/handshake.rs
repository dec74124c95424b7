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
use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

pub const SOCKS_VERSION: u8 = 0x05;
pub const CMD_CONNECT: u8 = 0x01;
pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x03;

/// Method selection reply: version 5, "no authentication required".
pub const NO_AUTH_REPLY: [u8; 2] = [SOCKS_VERSION, 0x00];

/// Request reply: succeeded, bound to 0.0.0.0:0.
///
/// Sent before the upstream is dialed. A later failure is only visible to the
/// client as a closed connection.
pub const SUCCESS_REPLY: [u8; 10] = [SOCKS_VERSION, 0x00, 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0];

/// A parsed CONNECT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub version: u8,
    pub command: u8,
    pub address_type: u8,
    /// Domain name, or dotted-quad for IPv4 requests
    pub host: String,
    pub port: u16,
}

impl ConnectRequest {
    /// `host:port` form of the destination
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONNECT {}:{}", self.host, self.port)
    }
}

/// Run the server side of the SOCKS5 negotiation on `stream`.
///
/// Returns the requested destination after both replies have been written.
/// On any error nothing more is written and the caller is expected to drop
/// the connection.
pub async fn accept<S>(stream: &mut S) -> Result<ConnectRequest>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let methods = read_method_selection(stream).await?;
    trace!("Client offered {} authentication method(s)", methods.len());

    write_reply(stream, &NO_AUTH_REPLY).await?;

    let request = read_connect_request(stream).await?;
    debug!("Received SOCKS5 request: {}", request);

    write_reply(stream, &SUCCESS_REPLY).await?;
    Ok(request)
}

/// Read `VER NMETHODS METHODS`.
pub async fn read_method_selection<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader
        .read_exact(&mut header)
        .await
        .map_err(Error::Protocol)?;
    let [version, method_count] = header;

    let mut methods = vec![0u8; method_count as usize];
    reader
        .read_exact(&mut methods)
        .await
        .map_err(Error::Protocol)?;

    if version != SOCKS_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    if methods.is_empty() {
        return Err(Error::NoAuthMethod);
    }
    Ok(methods)
}

/// Read `VER CMD RSV ATYP DST.ADDR DST.PORT`.
///
/// Version and command are validated before any address byte is consumed.
pub async fn read_connect_request<R>(reader: &mut R) -> Result<ConnectRequest>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .await
        .map_err(Error::Protocol)?;
    let [version, command, _reserved, address_type] = header;

    if version != SOCKS_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    if command != CMD_CONNECT {
        return Err(Error::UnsupportedCommand(command));
    }

    let host = match address_type {
        ATYP_IPV4 => {
            let mut octets = [0u8; 4];
            reader
                .read_exact(&mut octets)
                .await
                .map_err(Error::Protocol)?;
            Ipv4Addr::from(octets).to_string()
        }
        ATYP_DOMAIN => {
            let len = reader.read_u8().await.map_err(Error::Protocol)?;
            let mut domain = vec![0u8; len as usize];
            reader
                .read_exact(&mut domain)
                .await
                .map_err(Error::Protocol)?;
            String::from_utf8(domain).map_err(|e| {
                Error::Protocol(io::Error::new(io::ErrorKind::InvalidData, e))
            })?
        }
        other => return Err(Error::UnsupportedAddressType(other)),
    };

    let port = reader.read_u16().await.map_err(Error::Protocol)?;

    Ok(ConnectRequest {
        version,
        command,
        address_type,
        host,
        port,
    })
}

async fn write_reply<W>(writer: &mut W, reply: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(reply).await.map_err(Error::Protocol)?;
    writer.flush().await.map_err(Error::Protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_method_selection_accepts_any_offer() {
        // Only GSSAPI and username/password offered; we still answer "no auth".
        let mut input: &[u8] = &[5, 2, 0x01, 0x02];
        let methods = read_method_selection(&mut input).await.unwrap();
        assert_eq!(methods, vec![0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_read_method_selection_rejects_socks4() {
        let mut input: &[u8] = &[4, 1, 0];
        let err = read_method_selection(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(4)));
    }

    #[tokio::test]
    async fn test_read_method_selection_rejects_empty_offer() {
        let mut input: &[u8] = &[5, 0];
        let err = read_method_selection(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::NoAuthMethod));
    }

    #[tokio::test]
    async fn test_read_connect_request_ipv4() {
        let mut input: &[u8] = &[5, 1, 0, 1, 10, 0, 0, 7, 0x1F, 0x90];
        let request = read_connect_request(&mut input).await.unwrap();
        assert_eq!(request.host, "10.0.0.7");
        assert_eq!(request.port, 8080);
        assert_eq!(request.target(), "10.0.0.7:8080");
    }

    #[tokio::test]
    async fn test_read_connect_request_rejects_non_utf8_domain() {
        let mut input: &[u8] = &[5, 1, 0, 3, 2, 0xFF, 0xFE, 0, 80];
        let err = read_connect_request(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_connect_request_truncated_port() {
        let mut input: &[u8] = &[5, 1, 0, 3, 1, b'a', 0];
        let err = read_connect_request(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_success_reply_layout() {
        assert_eq!(SUCCESS_REPLY.len(), 10);
        assert_eq!(SUCCESS_REPLY[3], ATYP_IPV4);
    }
}
