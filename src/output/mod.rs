// Output module for meshctl

pub mod errors;
pub mod table;
pub mod terminal;

pub use errors::MeshError;
pub use table::{format_size, Listing};
pub use terminal::{OutputFormat, TerminalOutput};
