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

//! Authentication seam between tunnel setup and the credential store.

use super::client::ClientHandler;
use crate::error::{DialFailure, Result};
use crate::tunnel::Cleanup;
use async_trait::async_trait;
use russh::client::Handle;
use std::fmt;

/// Authenticates the user on a session whose key exchange has completed.
///
/// One authenticator is opened per route activation and reused for every hop
/// of that activation.
#[async_trait]
pub trait Authenticator: Send {
    async fn authenticate(
        &mut self,
        handle: &mut Handle<ClientHandler>,
        user: &str,
    ) -> std::result::Result<(), DialFailure>;

    /// Hand over whatever the authenticator keeps open, to be released when
    /// the activation is torn down.
    fn into_cleanup(self: Box<Self>) -> Cleanup;
}

/// Opens an [`Authenticator`] for each activation.
#[async_trait]
pub trait Credentials: Send + Sync + fmt::Debug {
    async fn open(&self) -> Result<Box<dyn Authenticator>>;
}
