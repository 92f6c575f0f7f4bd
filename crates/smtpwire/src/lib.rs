//! # smtpwire
//!
//! A client-side SMTP (RFC 5321) and LMTP (RFC 2033) protocol engine.
//!
//! ## Features
//!
//! - **Sans-I/O core**: [`Protocol`] consumes bytes and produces bytes,
//!   transport instructions and lifecycle events
//! - **Handshake**: EHLO/LHLO with HELO fallback, opportunistic or required
//!   STARTTLS, implicit TLS via rustls
//! - **Authentication**: PLAIN, LOGIN, XOAUTH2
//! - **Transactions**: MAIL FROM / RCPT TO with per-recipient failures, DATA
//!   with dot-stuffing, per-recipient delivery status in LMTP mode
//! - **Idle timeout** that scales with the number of bytes written
//!
//! ## Quick Start
//!
//! ```ignore
//! use smtpwire::{Client, Config, Credentials, Envelope, ProtocolEvent};
//!
//! #[tokio::main]
//! async fn main() -> smtpwire::Result<()> {
//!     let config = Config::builder("smtp.example.com")
//!         .port(587)
//!         .auth(Credentials::password("user@example.com", "password"))
//!         .build();
//!     let mut client = Client::connect(config).await?;
//!
//!     while let Some(event) = client.next_event().await? {
//!         match event {
//!             ProtocolEvent::Idle => client.use_envelope(Envelope::new(
//!                 "user@example.com",
//!                 ["friend@example.com"],
//!             )),
//!             ProtocolEvent::Ready { .. } => {
//!                 client.end(Some("Subject: hi\r\n\r\nHello!\r\n"));
//!             }
//!             ProtocolEvent::Done { .. } => client.quit(),
//!             ProtocolEvent::Error(e) => eprintln!("{e}"),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Sans-I/O state machine
//! - [`connection`]: Transports and the async [`Client`] driver
//! - [`parser`]: Streaming reply parser
//! - [`command`]: SMTP command builders
//! - [`types`]: Replies and EHLO capabilities

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod connection;
pub mod envelope;
mod error;
pub mod parser;
pub mod protocol;
pub mod sasl;
pub mod types;

pub use config::{Config, ConfigBuilder, Credentials, Secret};
pub use connection::{Client, SmtpStream, Transport};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use protocol::{Output, Protocol, ProtocolEvent, State};
pub use types::{AuthMechanism, Capabilities, ReplyCode, Response};
