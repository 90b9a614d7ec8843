// Fleet and resource operations built on the remote and api layers

pub mod resolver;
pub mod runcmd;
pub mod service;
pub mod show;
pub mod shutdown;
pub mod volumes;

pub use resolver::{resolve, Scope};
pub use service::{RunOptions, ServiceAction, ServiceRole};
