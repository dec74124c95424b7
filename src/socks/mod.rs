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

//! Inbound SOCKS5 protocol handling.
//!
//! Only the subset a local front-end needs is accepted: the "no authentication"
//! method, the CONNECT command, and domain-name or IPv4 destinations.
//!
//! ```text
//! client                         proxs
//!   | VER NMETHODS METHODS  -->    |
//!   |                 <-- 05 00    |
//!   | VER CMD RSV ATYP ADDR PORT ->|
//!   |  <-- 05 00 00 01 0.0.0.0:0   |
//! ```

mod handshake;

pub use handshake::{
    accept, read_connect_request, read_method_selection, ConnectRequest, ATYP_DOMAIN, ATYP_IPV4,
    CMD_CONNECT, NO_AUTH_REPLY, SOCKS_VERSION, SUCCESS_REPLY,
};
