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

//! The SOCKS5 front-end: listener, per-connection sessions and counters.
//!
//! ```text
//! accept ─▶ handshake ─▶ select route ─▶ activate ─▶ dial ─▶ relay ─▶ deactivate
//! ```
//!
//! Any failure ends only the session it happened in.

mod server;
mod session;
mod stats;

pub use server::ProxyServer;
pub use session::{handle_connection, SessionContext, SessionSummary};
pub use stats::ProxyStats;
