//! Core SMTP types.

mod extension;
mod response;

pub use extension::{AuthMechanism, Capabilities};
pub use response::{ReplyCode, Response};
