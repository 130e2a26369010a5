pub mod discovery;
pub mod http;
pub mod shutdown;

pub use discovery::{
    DiscoveryClient, HeartbeatConfig, HeartbeatLoop, MaxAttemptBackoff, RegistrationTask,
    RegistryApi, ServiceUrlSelector,
};
pub use http::ReqwestTransport;
pub use shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownReason, StopFuture, StopHook};
