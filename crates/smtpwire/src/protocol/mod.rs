//! Sans-I/O SMTP/LMTP protocol implementation.
//!
//! This module provides a pure state machine for the client side of SMTP,
//! completely separated from I/O operations. The I/O layer:
//!
//! - calls [`Protocol::handle_open`] once the transport is connected,
//! - feeds received bytes via [`Protocol::handle_input`],
//! - drains [`Protocol::poll_output`] and carries out every [`Output`] in
//!   order (write bytes, upgrade to TLS, close, deliver an event),
//! - watches [`Protocol::poll_timeout`] and calls
//!   [`Protocol::handle_timeout`] when the deadline passes,
//! - reports transport failures through [`Protocol::handle_transport_error`]
//!   and [`Protocol::handle_close`].
//!
//! Exactly one command is outstanding at any time; the protocol never
//! pipelines.
//!
//! # Example
//!
//! ```
//! use smtpwire::protocol::{Output, Protocol, ProtocolEvent};
//! use smtpwire::Config;
//!
//! let mut protocol = Protocol::new(Config::new("smtp.example.com"));
//! protocol.handle_open();
//! protocol.handle_input(b"220 smtp.example.com ESMTP\r\n");
//!
//! let Some(Output::Transmit(t)) = protocol.poll_output() else { panic!() };
//! assert_eq!(t.as_str(), Some("EHLO localhost\r\n"));
//!
//! protocol.handle_input(b"250 smtp.example.com\r\n");
//! assert!(matches!(
//!     protocol.poll_output(),
//!     Some(Output::Event(ProtocolEvent::Idle))
//! ));
//! ```

mod state;
pub mod timeout;
mod transmit;

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{Span, debug, error, info, warn};

pub use state::State;
pub use timeout::TimeoutManager;
pub use transmit::{Output, ProtocolEvent, Transmit};

use crate::command::Command;
use crate::config::{Config, Credentials};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::parser::{ParserEvent, ResponseParser};
use crate::sasl;
use crate::types::{AuthMechanism, Capabilities, ReplyCode, Response};

/// Queued message data above which `send` asks the caller to wait for
/// [`ProtocolEvent::Drain`].
pub const HIGH_WATER_MARK: usize = 64 * 1024;

/// Sans-I/O SMTP client state machine.
///
/// Feed it bytes, and it will produce bytes to send and events to process.
pub struct Protocol {
    config: Config,
    state: State,
    parser: ResponseParser,
    envelope: Envelope,
    outputs: VecDeque<Output>,
    timeout: TimeoutManager,
    /// Undecoded tail of a multi-byte UTF-8 sequence split across reads.
    utf8_pending: Vec<u8>,
    secure_mode: bool,
    data_mode: bool,
    supported_auth: Vec<AuthMechanism>,
    authenticated_as: Option<String>,
    max_allowed_size: Option<u64>,
    /// Last (at most two) bytes of message data written.
    last_data_bytes: Vec<u8>,
    queued_bytes: usize,
    wait_drain: bool,
    /// Set by a successful STARTTLS reply; the rest of that read is plaintext
    /// and must not reach the parser.
    upgrading: bool,
    open: bool,
    closing: bool,
    destroyed: bool,
    span: Span,
}

impl Protocol {
    /// Creates a protocol instance for one connection.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let user = config.auth.as_ref().map_or("", |c| c.user.as_str());
        let span = tracing::info_span!("smtp", user = %user, host = %config.host);
        let timeout = TimeoutManager::new(config.timeout_lower_bound, config.timeout_per_byte_ms);

        Self {
            secure_mode: config.use_secure_transport,
            config,
            state: State::Connecting,
            parser: ResponseParser::new(),
            envelope: Envelope::default(),
            outputs: VecDeque::new(),
            timeout,
            utf8_pending: Vec::new(),
            data_mode: false,
            supported_auth: Vec::new(),
            authenticated_as: None,
            max_allowed_size: None,
            last_data_bytes: Vec::new(),
            queued_bytes: 0,
            wait_drain: false,
            upgrading: false,
            open: false,
            closing: false,
            destroyed: false,
            span,
        }
    }

    // === Accessors ===

    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the current (or last) envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns true if the channel is TLS protected.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure_mode
    }

    /// Returns true while message data is accepted by [`send`](Self::send).
    #[must_use]
    pub const fn is_data_mode(&self) -> bool {
        self.data_mode
    }

    /// Returns true once the connection has been closed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Authentication mechanisms advertised by the server.
    #[must_use]
    pub fn supported_auth(&self) -> &[AuthMechanism] {
        &self.supported_auth
    }

    /// The authenticated username, if any.
    #[must_use]
    pub fn authenticated_as(&self) -> Option<&str> {
        self.authenticated_as.as_deref()
    }

    /// Maximum message size advertised with `SIZE`.
    #[must_use]
    pub const fn max_allowed_size(&self) -> Option<u64> {
        self.max_allowed_size
    }

    /// Returns the idle deadline, if one is armed.
    #[must_use]
    pub const fn poll_timeout(&self) -> Option<Instant> {
        self.timeout.deadline()
    }

    /// Returns the next step for the I/O layer.
    ///
    /// An [`ProtocolEvent::Idle`] that is no longer true (the caller issued
    /// another command after the preceding event) is dropped here.
    pub fn poll_output(&mut self) -> Option<Output> {
        loop {
            let output = self.outputs.pop_front()?;
            match &output {
                Output::Event(ProtocolEvent::Idle) if self.state != State::Idle => {
                    let _enter = self.span.enter();
                    debug!("idle cancelled, state is now {:?}", self.state);
                }
                Output::Transmit(t) => {
                    self.queued_bytes = self.queued_bytes.saturating_sub(t.len());
                    return Some(output);
                }
                _ => return Some(output),
            }
        }
    }

    // === Transport callbacks ===

    /// The transport is connected; the greeting is expected next.
    pub fn handle_open(&mut self) {
        if self.destroyed || self.open {
            return;
        }
        self.open = true;
        self.state = State::Greeting;
        self.timeout.on_send(0, false, Instant::now());
    }

    /// Feeds received bytes into the protocol.
    ///
    /// Input arriving after a close was requested is dropped.
    pub fn handle_input(&mut self, data: &[u8]) {
        if self.destroyed || self.closing {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.timeout.clear();
        let text = self.decode(data);
        debug!("S: {}", escape_crlf(&text));

        let mut events = self.parser.feed(&text).into_iter();
        for event in events.by_ref() {
            if self.destroyed || self.closing {
                break;
            }
            match event {
                ParserEvent::Response(response) => self.dispatch(&response),
                ParserEvent::Error(err) => warn!("{err}"),
                ParserEvent::End => {}
            }
            if self.upgrading {
                break;
            }
        }

        if std::mem::take(&mut self.upgrading) {
            let dropped = events
                .filter(|e| matches!(e, ParserEvent::Response(_)))
                .count();
            if dropped > 0 || !self.utf8_pending.is_empty() {
                warn!("discarding plaintext received after STARTTLS ({dropped} replies)");
            }
            self.parser = ResponseParser::new();
            self.utf8_pending.clear();
        }
    }

    /// Queued writes up to this point reached the transport.
    pub fn handle_drain(&mut self) {
        if self.wait_drain && self.queued_bytes == 0 {
            self.wait_drain = false;
            self.push_event(ProtocolEvent::Drain);
        }
    }

    /// Checks the idle deadline at `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.destroyed || self.closing || !self.timeout.is_expired(now) {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        let window = self.timeout.window().unwrap_or(self.config.timeout_lower_bound);
        self.timeout.clear();
        self.fail(Error::Timeout(window));
    }

    /// The transport failed.
    ///
    /// Failures reported after a close was requested are only logged.
    pub fn handle_transport_error(&mut self, err: Error) {
        let span = self.span.clone();
        let _enter = span.enter();
        if self.destroyed || self.closing {
            debug!("ignoring transport error while closing: {err}");
            return;
        }
        self.fail(err);
    }

    /// The transport is closed.
    pub fn handle_close(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();
        debug!("Socket closed.");
        self.destroy();
    }

    // === Caller commands ===

    /// Closes the connection without QUIT.
    pub fn close(&mut self) {
        if self.destroyed || self.closing {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        if self.open {
            self.closing = true;
            self.outputs.push_back(Output::Close);
        } else {
            self.destroy();
        }
    }

    /// Sends QUIT; the connection is closed on whatever comes back.
    pub fn quit(&mut self) {
        if self.destroyed {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        self.send_command(&Command::Quit);
        self.state = State::Quit;
    }

    /// Sends RSET and authenticates again, optionally with new credentials.
    pub fn reset(&mut self, auth: Option<Credentials>) {
        if self.destroyed {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        if let Some(auth) = auth {
            self.config.auth = Some(auth);
        }
        self.send_command(&Command::Rset);
        self.state = State::Rset;
    }

    /// Starts a mail transaction with `MAIL FROM`.
    pub fn use_envelope(&mut self, mut envelope: Envelope) {
        if self.destroyed {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        envelope.default_sender(&self.config.name);
        let from = envelope.from().to_string();
        self.envelope = envelope;
        self.state = State::Mail;
        self.send_command(&Command::MailFrom { from });
    }

    /// Queues message data.
    ///
    /// Returns true when the caller should wait for
    /// [`ProtocolEvent::Drain`] before sending more. Outside data mode this
    /// is a no-op that returns true.
    pub fn send(&mut self, chunk: &str) -> bool {
        if !self.data_mode {
            return true;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        self.send_data(chunk)
    }

    /// Finishes message data with the `.` terminator line.
    ///
    /// The terminator is shortened so that a line break the data already
    /// ended with is not repeated. Outside data mode this is a no-op that
    /// returns true.
    pub fn end(&mut self, chunk: Option<&str>) -> bool {
        if !self.data_mode {
            return true;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        if let Some(chunk) = chunk.filter(|c| !c.is_empty()) {
            self.send_data(chunk);
        }

        self.state = State::Stream;

        let terminator: &[u8] = if self.last_data_bytes == b"\r\n" {
            b".\r\n"
        } else if self.last_data_bytes.last() == Some(&b'\r') {
            b"\n.\r\n"
        } else {
            b"\r\n.\r\n"
        };
        self.send_raw(terminator.to_vec());

        self.data_mode = false;
        self.timeout.end_data();
        self.update_wait_drain()
    }

    // === Internals ===

    fn decode(&mut self, data: &[u8]) -> String {
        self.utf8_pending.extend_from_slice(data);
        let buf = std::mem::take(&mut self.utf8_pending);
        match std::str::from_utf8(&buf) {
            Ok(text) => text.to_string(),
            Err(e) if e.error_len().is_none() => {
                let (valid, tail) = buf.split_at(e.valid_up_to());
                self.utf8_pending = tail.to_vec();
                String::from_utf8_lossy(valid).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&buf).into_owned(),
        }
    }

    fn push_event(&mut self, event: ProtocolEvent) {
        self.outputs.push_back(Output::Event(event));
    }

    fn send_command(&mut self, cmd: &Command) {
        debug!("C: {}", cmd.redacted());
        self.send_raw(cmd.serialize());
    }

    fn send_raw(&mut self, data: Vec<u8>) {
        self.timeout.on_send(data.len(), self.data_mode, Instant::now());
        self.queued_bytes += data.len();
        self.outputs.push_back(Output::Transmit(Transmit::new(data)));
    }

    fn send_data(&mut self, chunk: &str) -> bool {
        let mut data = if self.config.disable_escaping {
            chunk.to_string()
        } else {
            chunk.replace("\n.", "\n..")
        };
        if !self.config.disable_escaping
            && data.starts_with('.')
            && self.last_data_bytes.last().is_none_or(|b| *b == b'\n')
        {
            data.insert(0, '.');
        }

        let bytes = data.into_bytes();
        if bytes.len() >= 2 {
            self.last_data_bytes = bytes[bytes.len() - 2..].to_vec();
        } else if let Some(&b) = bytes.first() {
            self.last_data_bytes.push(b);
            if self.last_data_bytes.len() > 2 {
                self.last_data_bytes.remove(0);
            }
        }

        debug!("Sending {} bytes of payload", bytes.len());
        self.send_raw(bytes);
        self.update_wait_drain()
    }

    fn update_wait_drain(&mut self) -> bool {
        if self.queued_bytes >= HIGH_WATER_MARK {
            self.wait_drain = true;
        }
        self.wait_drain
    }

    fn fail(&mut self, err: Error) {
        error!("{err}");
        self.push_event(ProtocolEvent::Error(err));
        self.close();
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.state = State::Closed;
        self.data_mode = false;
        self.timeout.clear();
        self.push_event(ProtocolEvent::Closed);
    }

    fn credentials(&self) -> Option<Credentials> {
        self.config.auth.clone()
    }

    /// Routes a reply to the handler of the current state.
    fn dispatch(&mut self, response: &Response) {
        match self.state {
            State::Connecting | State::Closed => {
                debug!("ignoring reply in state {:?}", self.state);
            }
            State::Greeting => self.on_greeting(response),
            State::Lhlo => self.on_lhlo(response),
            State::Ehlo => self.on_ehlo(response),
            State::Helo => self.on_helo(response),
            State::StartTls => self.on_starttls(response),
            State::AuthLoginUser => self.on_auth_login_user(response),
            State::AuthLoginPass => self.on_auth_login_pass(response),
            State::AuthXOAuth2 => self.on_auth_xoauth2(response),
            State::AuthComplete => self.on_auth_complete(response),
            State::Idle => self.on_idle(response),
            State::Mail => self.on_mail(response),
            State::Rcpt => self.on_rcpt(response),
            State::Data => self.on_data(response),
            State::Stream => self.on_stream(response),
            State::Rset => self.on_rset(response),
            State::Quit => self.close(),
        }
    }

    fn on_greeting(&mut self, response: &Response) {
        if response.status_code != ReplyCode::SERVICE_READY {
            self.fail(Error::Protocol(format!(
                "Invalid greeting: {}",
                response.data
            )));
            return;
        }

        let hostname = self.config.name.clone();
        if self.config.lmtp {
            info!("Sending LHLO {hostname}");
            self.state = State::Lhlo;
            self.send_command(&Command::Lhlo { hostname });
        } else {
            info!("Sending EHLO {hostname}");
            self.state = State::Ehlo;
            self.send_command(&Command::Ehlo { hostname });
        }
    }

    fn on_lhlo(&mut self, response: &Response) {
        if !response.success {
            error!("LHLO not successful");
            self.fail(response.to_error());
            return;
        }
        self.on_ehlo(response);
    }

    fn on_ehlo(&mut self, response: &Response) {
        if !response.success {
            if !self.secure_mode && self.config.require_tls {
                self.fail(Error::Protocol(
                    "STARTTLS not supported without EHLO".into(),
                ));
                return;
            }

            warn!("EHLO not successful, trying HELO {}", self.config.name);
            self.state = State::Helo;
            let hostname = self.config.name.clone();
            self.send_command(&Command::Helo { hostname });
            return;
        }

        let caps = Capabilities::sniff(&response.line);
        for mech in caps.auth {
            if !self.supported_auth.contains(&mech) {
                debug!("Server supports AUTH {mech}");
                self.supported_auth.push(mech);
            }
        }
        if let Some(size) = caps.size {
            debug!("Maximum allowed message size: {size}");
            self.max_allowed_size = Some(size);
        }

        if !self.secure_mode
            && ((caps.starttls && !self.config.ignore_tls) || self.config.require_tls)
        {
            info!("Sending STARTTLS");
            self.state = State::StartTls;
            self.send_command(&Command::StartTls);
            return;
        }

        self.authenticate();
    }

    fn on_helo(&mut self, response: &Response) {
        if !response.success {
            error!("HELO not successful");
            self.fail(response.to_error());
            return;
        }
        self.authenticate();
    }

    fn on_starttls(&mut self, response: &Response) {
        if !response.success {
            error!("STARTTLS not successful");
            self.fail(response.to_error());
            return;
        }

        self.secure_mode = true;
        // capabilities announced before the upgrade are discarded (RFC 3207)
        self.supported_auth.clear();
        self.upgrading = true;
        self.outputs.push_back(Output::UpgradeTls);

        self.state = State::Ehlo;
        let hostname = self.config.name.clone();
        self.send_command(&Command::Ehlo { hostname });
    }

    /// Picks an authentication method and sends the first AUTH step.
    fn authenticate(&mut self) {
        let Some(creds) = self.credentials() else {
            self.state = State::Idle;
            self.push_event(ProtocolEvent::Idle);
            return;
        };

        let method = self
            .config
            .auth_method
            .or_else(|| creds.token().map(|_| AuthMechanism::XOAuth2))
            .or_else(|| self.supported_auth.first().copied())
            .unwrap_or(AuthMechanism::Plain);

        debug!("Authenticating as {} with {method}", creds.user);

        match (method, creds.pass(), creds.token()) {
            (AuthMechanism::Login, Some(_), _) => {
                self.state = State::AuthLoginUser;
                self.send_command(&Command::Auth {
                    mechanism: AuthMechanism::Login,
                    initial_response: None,
                });
            }
            (AuthMechanism::Plain, Some(pass), _) => {
                self.state = State::AuthComplete;
                let payload = sasl::plain_response(&creds.user, pass);
                self.send_command(&Command::Auth {
                    mechanism: AuthMechanism::Plain,
                    initial_response: Some(payload),
                });
            }
            (AuthMechanism::XOAuth2, _, Some(token)) => {
                self.state = State::AuthXOAuth2;
                let payload = sasl::xoauth2_response(&creds.user, token);
                self.send_command(&Command::Auth {
                    mechanism: AuthMechanism::XOAuth2,
                    initial_response: Some(payload),
                });
            }
            (AuthMechanism::XOAuth2, _, None) => {
                self.fail(Error::AuthMethod(
                    "Authentication method XOAUTH2 requires an access token".into(),
                ));
            }
            (mech, None, _) => {
                self.fail(Error::AuthMethod(format!(
                    "Authentication method {mech} requires a password"
                )));
            }
        }
    }

    fn on_auth_login_user(&mut self, response: &Response) {
        if response.status_code != ReplyCode::AUTH_CONTINUE
            || response.data != sasl::LOGIN_USERNAME_CHALLENGE
        {
            self.fail(Error::Protocol(format!(
                "Invalid login sequence while waiting for \"334 {} \": {}",
                sasl::LOGIN_USERNAME_CHALLENGE,
                response.data
            )));
            return;
        }

        debug!("AUTH LOGIN USER");
        let user = self.credentials().map(|c| c.user).unwrap_or_default();
        self.state = State::AuthLoginPass;
        self.send_command(&Command::AuthResponse(sasl::login_response(&user)));
    }

    fn on_auth_login_pass(&mut self, response: &Response) {
        if response.status_code != ReplyCode::AUTH_CONTINUE
            || response.data != sasl::LOGIN_PASSWORD_CHALLENGE
        {
            self.fail(Error::Protocol(format!(
                "Invalid login sequence while waiting for \"334 {} \": {}",
                sasl::LOGIN_PASSWORD_CHALLENGE,
                response.data
            )));
            return;
        }

        debug!("AUTH LOGIN PASS");
        let pass = self
            .credentials()
            .and_then(|c| c.pass().map(str::to_string))
            .unwrap_or_default();
        self.state = State::AuthComplete;
        self.send_command(&Command::AuthResponse(sasl::login_response(&pass)));
    }

    fn on_auth_xoauth2(&mut self, response: &Response) {
        if response.success {
            self.on_auth_complete(response);
            return;
        }
        // The server sent its error details as a challenge; an empty line
        // completes the exchange.
        warn!("Error during AUTH XOAUTH2, sending empty response");
        self.state = State::AuthComplete;
        self.send_command(&Command::AuthResponse(String::new()));
    }

    fn on_auth_complete(&mut self, response: &Response) {
        if !response.success {
            error!("Authentication failed: {}", response.data);
            self.fail(response.to_error());
            return;
        }

        let user = self.credentials().map(|c| c.user);
        info!("Authentication successful");
        self.authenticated_as = user;
        self.state = State::Idle;
        self.push_event(ProtocolEvent::Idle);
    }

    fn on_idle(&mut self, response: &Response) {
        let text = if response.status_code.as_u16() > 300 {
            response.line.clone()
        } else {
            response.data.clone()
        };
        self.fail(Error::Protocol(text));
    }

    fn on_mail(&mut self, response: &Response) {
        if !response.success {
            error!("MAIL FROM unsuccessful");
            self.fail(response.to_error());
            return;
        }

        let Some(rcpt) = self.envelope.next_recipient().map(str::to_string) else {
            self.fail(Error::Protocol(
                "Can't send mail - no recipients defined".into(),
            ));
            return;
        };

        debug!("MAIL FROM successful, proceeding with {} recipients", self.envelope.to().len());
        self.state = State::Rcpt;
        self.send_command(&Command::RcptTo { to: rcpt });
    }

    fn on_rcpt(&mut self, response: &Response) {
        let lmtp = self.config.lmtp;
        if let Some(rcpt) = self.envelope.record_rcpt(response.success, lmtp) {
            if response.success {
                debug!("RCPT TO accepted for: {rcpt}");
            } else {
                warn!("RCPT TO failed for: {rcpt}");
            }
        }

        if let Some(next) = self.envelope.next_recipient().map(str::to_string) {
            self.state = State::Rcpt;
            self.send_command(&Command::RcptTo { to: next });
            return;
        }

        if self.envelope.any_accepted() {
            self.state = State::Data;
            self.send_command(&Command::Data);
        } else {
            self.fail(Error::Protocol(
                "Can't send mail - all recipients were rejected".into(),
            ));
            if !self.destroyed {
                self.state = State::Idle;
            }
        }
    }

    fn on_data(&mut self, response: &Response) {
        // some servers answer DATA with 250 instead of 354
        if response.status_code != ReplyCode::OK && response.status_code != ReplyCode::START_DATA
        {
            error!("DATA unsuccessful");
            self.fail(response.to_error());
            return;
        }

        self.data_mode = true;
        self.last_data_bytes.clear();
        self.state = State::Idle;
        self.push_event(ProtocolEvent::Ready {
            failed_recipients: self.envelope.rcpt_failed().to_vec(),
        });
    }

    fn on_stream(&mut self, response: &Response) {
        if self.config.lmtp {
            if let Some(rcpt) = self.envelope.record_delivery(response.success) {
                if response.success {
                    info!("Local delivery to {rcpt} succeeded.");
                } else {
                    error!("Local delivery to {rcpt} failed.");
                }
            }

            if self.envelope.awaiting_delivery() > 0 {
                self.state = State::Stream;
                return;
            }

            self.state = State::Idle;
            self.push_event(ProtocolEvent::Done { success: true });
        } else {
            if response.success {
                info!("Message sent successfully.");
            } else {
                error!("Message sending failed.");
            }
            self.state = State::Idle;
            self.push_event(ProtocolEvent::Done {
                success: response.success,
            });
        }

        // dropped by poll_output if the caller moves on after Done
        self.push_event(ProtocolEvent::Idle);
    }

    fn on_rset(&mut self, response: &Response) {
        if !response.success {
            error!("RSET unsuccessful");
            self.fail(response.to_error());
            return;
        }
        self.authenticated_as = None;
        self.authenticate();
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("state", &self.state)
            .field("secure_mode", &self.secure_mode)
            .field("data_mode", &self.data_mode)
            .field("supported_auth", &self.supported_auth)
            .field("authenticated_as", &self.authenticated_as)
            .field("outbound_count", &self.outputs.len())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// Replaces CRLF with a visible marker for debug logging.
fn escape_crlf(s: &str) -> String {
    s.replace("\r\n", "<CRLF>")
}
