//! Wire model for the registry protocol.

mod application;
mod builder;
mod instance;

pub use application::{Application, ApplicationResponse, Applications, ApplicationsResponse};
pub use builder::{build_instance, build_instance_with_address, local_ipv4, resolve_address};
pub use instance::{
    DataCenterInfo, Instance, InstanceResponse, InstanceStatus, Port, RegistrationRequest,
    DEFAULT_DATACENTER_CLASS, MY_OWN_DATACENTER,
};
