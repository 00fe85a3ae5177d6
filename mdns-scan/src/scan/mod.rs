pub mod exchange;
pub mod registry;
pub mod scheduler;
pub mod targets;

use std::net::IpAddr;
use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;
use shared::types::Registry;
use crate::interface::LocalInterface;

pub use exchange::MulticastProber;
pub use registry::RegistryHandle;
pub use scheduler::Scanner;
pub use targets::Cidr;

/// Errors that stop a scan before any target is probed
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid CIDR '{0}': {1}")]
    InvalidCidr(String, String),

    #[error("{cidr} holds {hosts} hosts, more than the limit of {limit}")]
    TooManyTargets { cidr: String, hosts: u128, limit: u128 },

    #[error("result aggregator stopped unexpectedly: {0}")]
    Aggregator(String),
}

/// One query/response exchange against a single target address.
///
/// Implementations never fail: transport and decode problems are logged and
/// reduce the result to whatever was collected before them.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn query(
        &self,
        interface: &LocalInterface,
        service_names: &[String],
        target: IpAddr,
        timeout: Duration,
    ) -> Registry;
}
