//! SMTP reply types.

use crate::error::Error;

/// A complete SMTP reply, possibly assembled from several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Reply code (e.g., 250). Zero when the line could not be parsed.
    pub status_code: ReplyCode,
    /// Enhanced status code (RFC 3463), e.g. `2.1.0`.
    pub enhanced_status: Option<String>,
    /// Reply text, one segment per line joined by `\n`.
    pub data: String,
    /// Raw reply lines joined by `\n`.
    pub line: String,
    /// True iff the code is 2xx.
    pub success: bool,
}

impl Response {
    /// Creates a reply; `success` is derived from the code.
    #[must_use]
    pub fn new(
        status_code: ReplyCode,
        enhanced_status: Option<String>,
        data: impl Into<String>,
        line: impl Into<String>,
    ) -> Self {
        Self {
            status_code,
            enhanced_status,
            data: data.into(),
            line: line.into(),
            success: status_code.is_success(),
        }
    }

    /// Creates the placeholder reply emitted for a line that does not parse.
    #[must_use]
    pub fn invalid(status_code: ReplyCode, line: impl Into<String>) -> Self {
        let line = line.into();
        Self {
            status_code,
            enhanced_status: None,
            data: line.clone(),
            line,
            success: false,
        }
    }

    /// Returns the numeric reply code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.status_code.as_u16()
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient_error(&self) -> bool {
        self.status_code.is_transient()
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.status_code.is_permanent()
    }

    /// Converts the reply into an [`Error::Smtp`].
    #[must_use]
    pub fn to_error(&self) -> Error {
        Error::smtp_error(self.code(), self.data.clone())
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Reply codes the client state machine branches on
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 450 Mailbox unavailable (busy)
    pub const MAILBOX_BUSY: Self = Self(450);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    mod reply_code_tests {
        use super::*;

        #[test]
        fn classes() {
            assert!(ReplyCode::OK.is_success());
            assert!(ReplyCode::CLOSING.is_success());
            assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
            assert!(ReplyCode::START_DATA.is_intermediate());
            assert!(ReplyCode::MAILBOX_BUSY.is_transient());
            assert!(ReplyCode::SERVICE_UNAVAILABLE.is_transient());
            assert!(ReplyCode::AUTH_FAILED.is_permanent());
            assert!(ReplyCode::MAILBOX_UNAVAILABLE.is_permanent());
        }

        #[test]
        fn boundaries() {
            assert!(!ReplyCode::new(199).is_success());
            assert!(ReplyCode::new(200).is_success());
            assert!(ReplyCode::new(299).is_success());
            assert!(!ReplyCode::new(300).is_success());
            assert!(!ReplyCode::default().is_success());
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", ReplyCode::OK), "250");
            assert_eq!(format!("{}", ReplyCode::SYNTAX_ERROR), "500");
        }
    }

    mod response_tests {
        use super::*;

        #[test]
        fn success_derived_from_code() {
            let ok = Response::new(ReplyCode::OK, None, "Ok", "250 Ok");
            assert!(ok.success);
            let rejected = Response::new(ReplyCode::MAILBOX_UNAVAILABLE, None, "No", "550 No");
            assert!(!rejected.success);
            assert!(rejected.is_permanent_error());
        }

        #[test]
        fn invalid_is_never_successful() {
            let resp = Response::invalid(ReplyCode::OK, "garbage");
            assert!(!resp.success);
            assert_eq!(resp.data, "garbage");
            assert_eq!(resp.line, "garbage");
            assert_eq!(resp.code(), 250);
        }

        #[test]
        fn to_error_carries_code_and_text() {
            let resp = Response::new(ReplyCode::new(451), None, "try later", "451 try later");
            let err = resp.to_error();
            assert!(err.is_transient());
            assert_eq!(err.to_string(), "SMTP error 451: try later");
        }
    }
}
