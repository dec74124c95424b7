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

use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        // RUST_LOG wins so russh internals can be inspected directly
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter_directives(verbosity))
    }
}

fn filter_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "proxs=warn",
        1 => "proxs=info",
        // -vv: include russh handshake and channel logs
        2 => "proxs=debug,russh=debug",
        _ => "proxs=trace,russh=trace",
    }
}

/// Initialize console logging to stderr.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_by_verbosity() {
        assert_eq!(filter_directives(0), "proxs=warn");
        assert_eq!(filter_directives(1), "proxs=info");
        assert!(filter_directives(2).contains("russh=debug"));
        assert_eq!(filter_directives(3), filter_directives(7));
    }

    #[test]
    fn test_create_env_filter() {
        for verbosity in 0..4 {
            let _ = create_env_filter(verbosity);
        }
    }
}
