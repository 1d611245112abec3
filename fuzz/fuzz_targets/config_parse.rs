//! Fuzz test for router configuration parsing
//!
//! Tests that arbitrary TOML input doesn't cause panics when parsed as a
//! router configuration, and that any configuration that parses can be
//! applied to a fresh socket.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nanomesh_core::{MemoryPipe, RawRouter, RouterConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<RouterConfig>(s) {
            let router = RawRouter::<MemoryPipe>::with_config(&config);
            assert!(router.is_ok());
        }
    }
});
