pub mod address;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;

pub use tracing;

pub use address::AddressList;
pub use batch::{Configuration, MessageSpec};
pub use error::ConfigError;
