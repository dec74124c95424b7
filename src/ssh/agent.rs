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

//! SSH agent access.
//!
//! Private keys never leave the agent: every hop of a tunnel is authenticated
//! by asking the agent to sign, one identity at a time.

use super::auth::{Authenticator, Credentials};
use super::client::ClientHandler;
use crate::error::{DialFailure, Error, Result};
use crate::tunnel::Cleanup;
use async_trait::async_trait;
use russh::client::Handle;
use russh::keys::agent::client::AgentClient;
use russh::keys::PublicKey;
use std::path::PathBuf;
use tokio::net::UnixStream;

/// Where to find the agent socket.
#[derive(Debug, Clone, Default)]
pub struct AgentCredentials {
    socket: Option<PathBuf>,
}

impl AgentCredentials {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    /// Use `SSH_AUTH_SOCK`, read at construction time
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var_os("SSH_AUTH_SOCK")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn socket(&self) -> Option<&PathBuf> {
        self.socket.as_ref()
    }

    /// Open a fresh agent connection and load its identities
    pub async fn connect(&self) -> Result<AgentSigner> {
        let path = self.socket.as_ref().ok_or_else(|| {
            Error::AgentUnavailable("SSH_AUTH_SOCK is not set".to_string())
        })?;

        let mut client = AgentClient::connect_uds(path).await.map_err(|e| {
            Error::AgentUnavailable(format!("cannot connect to {}: {e}", path.display()))
        })?;

        let identities = client
            .request_identities()
            .await
            .map_err(|e| Error::AgentUnavailable(format!("failed to list identities: {e}")))?;

        if identities.is_empty() {
            return Err(Error::AgentUnavailable(
                "agent holds no identities".to_string(),
            ));
        }

        tracing::debug!(
            "SSH agent at {} offers {} identities",
            path.display(),
            identities.len()
        );
        Ok(AgentSigner { client, identities })
    }
}

#[async_trait]
impl Credentials for AgentCredentials {
    async fn open(&self) -> Result<Box<dyn Authenticator>> {
        Ok(Box::new(self.connect().await?))
    }
}

/// An open agent connection used to sign authentication requests.
pub struct AgentSigner {
    client: AgentClient<UnixStream>,
    identities: Vec<PublicKey>,
}

impl AgentSigner {
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}

#[async_trait]
impl Authenticator for AgentSigner {
    /// Try each agent identity until the server accepts one.
    async fn authenticate(
        &mut self,
        handle: &mut Handle<ClientHandler>,
        user: &str,
    ) -> std::result::Result<(), DialFailure> {
        let hash_alg = handle.best_supported_rsa_hash().await?.flatten();

        for identity in &self.identities {
            let result = handle
                .authenticate_publickey_with(user, identity.clone(), hash_alg, &mut self.client)
                .await;

            match result {
                Ok(auth_result) if auth_result.success() => {
                    tracing::debug!("Authenticated as {} with agent key", user);
                    return Ok(());
                }
                Ok(_) => tracing::trace!("Server rejected an agent key for {}", user),
                Err(e) => tracing::debug!("Agent signing failed: {:?}", e),
            }
        }

        Err(DialFailure::AuthRejected(user.to_string()))
    }

    /// Closes the agent connection
    fn into_cleanup(self: Box<Self>) -> Cleanup {
        Box::new(move || {
            drop(self);
            tracing::trace!("Closed SSH agent connection");
        })
    }
}

impl std::fmt::Debug for AgentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSigner")
            .field("identities", &self.identities.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_socket_is_agent_unavailable() {
        let credentials = AgentCredentials::default();
        let err = credentials.connect().await.unwrap_err();
        assert!(matches!(err, Error::AgentUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_socket_is_agent_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let credentials = AgentCredentials::new(dir.path().join("agent.sock"));
        let err = credentials.connect().await.unwrap_err();
        assert!(matches!(err, Error::AgentUnavailable(_)));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_auth_sock() {
        let saved = std::env::var_os("SSH_AUTH_SOCK");

        std::env::set_var("SSH_AUTH_SOCK", "/tmp/proxs-agent.sock");
        let credentials = AgentCredentials::from_env();
        assert_eq!(
            credentials.socket(),
            Some(&PathBuf::from("/tmp/proxs-agent.sock"))
        );

        // An empty value counts as unset
        std::env::set_var("SSH_AUTH_SOCK", "");
        assert!(AgentCredentials::from_env().socket().is_none());

        match saved {
            Some(value) => std::env::set_var("SSH_AUTH_SOCK", value),
            None => std::env::remove_var("SSH_AUTH_SOCK"),
        }
    }
}
