//! Beacon - a client for Eureka-style service registries
//!
//! Registers a running service instance, renews its lease with periodic
//! heartbeats and deregisters it when the process stops.

pub mod logging;
mod runtime;

#[doc(hidden)]
pub use beacon_core;
#[doc(hidden)]
pub use beacon_runtime;

// Assertion macros are #[macro_export]ed at the beacon_core crate root.
#[cfg(feature = "testing")]
pub use beacon_core::{assert_err_variant, assert_http_called, assert_http_not_called, assert_ok};

pub use runtime::prelude;
pub use runtime::{Beacon, BeaconBuilder};
