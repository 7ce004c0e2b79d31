//! Front end of the `batchmail` tool: reading the batch document and
//! obtaining the relay password.

pub mod credentials;
pub mod loader;

pub use loader::{Batch, load_batch, parse_batch};
