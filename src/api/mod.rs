// Provisioning API access
pub mod backend;
pub mod client;

pub use backend::{HttpBackend, ProvisioningBackend, SimulatedBackend};
pub use client::api_call;
