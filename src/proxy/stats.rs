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

use std::sync::atomic::{AtomicU64, Ordering};

/// Server-wide counters
#[derive(Debug, Default)]
pub struct ProxyStats {
    active_sessions: AtomicU64,
    sessions_accepted: AtomicU64,
    sessions_failed: AtomicU64,
    total_bytes_transferred: AtomicU64,
}

impl ProxyStats {
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    pub fn total_accepted(&self) -> u64 {
        self.sessions_accepted.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> u64 {
        self.sessions_failed.load(Ordering::Relaxed)
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.total_bytes_transferred.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_active(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_active(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_accepted(&self) {
        self.sessions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.total_bytes_transferred
            .fetch_add(bytes, Ordering::Relaxed);
    }
}
