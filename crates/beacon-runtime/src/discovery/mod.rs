mod backoff;
mod client;
mod heartbeat;
mod registry;
mod selector;

pub use backoff::{retry_notify, MaxAttemptBackoff};
pub use client::{DiscoveryClient, RegistrationTask};
pub use heartbeat::{HeartbeatConfig, HeartbeatLoop};
pub use registry::RegistryApi;
pub use selector::ServiceUrlSelector;
