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

//! SSH jump host (ProxyJump) support
//!
//! Tunnels whose SSH endpoint has a `ProxyJump` in the SSH config are reached
//! through one or more intermediate hosts.
//!
//! # Features
//! * OpenSSH-compatible syntax: `user1@jump1:port1,user2@jump2:port2`
//! * `ProxyJump none` disables jumping
//! * Single and multi-hop chains, each hop authenticated with the agent

pub mod chain;
pub mod parser;

pub use chain::{JumpConnection, JumpHostChain};
pub use parser::{parse_jump_hosts, JumpHost, MAX_JUMP_HOSTS};
