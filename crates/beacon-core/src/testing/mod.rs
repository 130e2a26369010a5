//! Testing utilities for registry clients.
//!
//! - [`MockHttp`] stands in for the HTTP transport, scripting registry
//!   responses and recording every request with its tokio-clock timestamp.
//! - Assertion macros (`assert_ok!`, `assert_err_variant!`, ...) for results.
//!
//! Pair the mock with `#[tokio::test(start_paused = true)]` so backoff
//! intervals and heartbeat ticks advance instantly and deterministically.

pub mod assertions;
pub mod mock_http;

pub use assertions::*;
pub use mock_http::{MockHttp, MockResponse, RecordedRequest};
