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

//! Destination-based route selection and per-route tunnel activation.
//!
//! A route is selected by the first of its glob patterns that matches the
//! requested domain, scanning routes in configuration order. Each route owns
//! at most one live tunnel, shared by the sessions that selected it.

mod route;
mod table;

pub use route::{Route, RouteSpec};
pub use table::RouteTable;
