// meshctl - operations CLI for distributed storage clusters
//
// Fleet-wide service control over SSH (parallel fan-out with aggregated
// reporting) plus pass-through access to the cluster management API.

pub mod api;
pub mod config;
pub mod ops;
pub mod output;
pub mod remote;

pub use config::Settings;
pub use output::MeshError;
pub use remote::{CommandSpec, HostResult, Outcome, RemoteResult};

/// Version of the meshctl tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
