//! Transports and the async client driver.

mod client;
mod stream;

pub use client::Client;
pub use stream::{SmtpStream, Transport, create_tls_connector};
