pub mod config;
pub mod error;
pub mod model;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{BeaconConfig, ClientConfig, InstanceConfig};
pub use error::{BeaconError, Result};
pub use model::{Application, Instance, InstanceStatus};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method};
