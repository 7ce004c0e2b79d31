pub mod client;
pub mod extensions;

pub use client::{ClientError, Response, SmtpClient};
pub use extensions::Capabilities;
