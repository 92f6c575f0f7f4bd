//! Async driver that pumps bytes between a transport and the protocol.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

use super::{SmtpStream, Transport};
use crate::config::{Config, Credentials};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::protocol::{Output, Protocol, ProtocolEvent};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// What woke the driver up.
enum Wake {
    Read(std::io::Result<usize>),
    Timeout,
}

/// SMTP client bound to one connection.
///
/// Commands such as [`use_envelope`](Self::use_envelope) only queue work;
/// [`next_event`](Self::next_event) writes it out, reads replies and returns
/// the next [`ProtocolEvent`].
pub struct Client<T> {
    transport: Option<T>,
    protocol: Protocol,
    read_buf: BytesMut,
    suspended: bool,
}

impl Client<SmtpStream> {
    /// Connects to `config.host:config.port` over TCP (or TLS for implicit
    /// TLS) and waits for the greeting on the first
    /// [`next_event`](Self::next_event).
    pub async fn connect(config: Config) -> Result<Self> {
        let stream = SmtpStream::connect(&config).await?;
        debug!("connected to {}:{}", config.host, config.port);
        Ok(Self::new(stream, config))
    }
}

impl<T: Transport> Client<T> {
    /// Wraps an already connected transport.
    pub fn new(transport: T, config: Config) -> Self {
        let mut protocol = Protocol::new(config);
        protocol.handle_open();
        Self {
            transport: Some(transport),
            protocol,
            read_buf: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            suspended: false,
        }
    }

    /// Returns the underlying protocol state machine.
    #[must_use]
    pub const fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Returns true while reading is paused.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Stops reading from the transport until [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Resumes reading from the transport.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Sends QUIT.
    pub fn quit(&mut self) {
        self.protocol.quit();
    }

    /// Sends RSET and authenticates again.
    pub fn reset(&mut self, auth: Option<Credentials>) {
        self.protocol.reset(auth);
    }

    /// Closes the connection without QUIT.
    pub fn close(&mut self) {
        self.protocol.close();
    }

    /// Starts a mail transaction.
    pub fn use_envelope(&mut self, envelope: Envelope) {
        self.protocol.use_envelope(envelope);
    }

    /// Queues message data. See [`Protocol::send`].
    pub fn send(&mut self, chunk: &str) -> bool {
        self.protocol.send(chunk)
    }

    /// Finishes message data. See [`Protocol::end`].
    pub fn end(&mut self, chunk: Option<&str>) -> bool {
        self.protocol.end(chunk)
    }

    /// Drives the connection until the next event.
    ///
    /// Returns `Ok(None)` once the connection is closed and every event has
    /// been delivered. Returns [`Error::InvalidState`] if reading is
    /// suspended and nothing else can make progress.
    pub async fn next_event(&mut self) -> Result<Option<ProtocolEvent>> {
        loop {
            if let Some(event) = self.flush_outputs().await {
                return Ok(Some(event));
            }
            self.protocol.handle_drain();
            if let Some(event) = self.flush_outputs().await {
                return Ok(Some(event));
            }

            if self.protocol.is_destroyed() {
                return Ok(None);
            }

            let deadline = self.protocol.poll_timeout();
            if self.suspended && deadline.is_none() {
                return Err(Error::InvalidState("reading is suspended".to_string()));
            }

            let Some(transport) = self.transport.as_mut() else {
                self.protocol.handle_close();
                continue;
            };

            self.read_buf.reserve(DEFAULT_BUFFER_SIZE);
            let read_buf = &mut self.read_buf;
            let suspended = self.suspended;

            let wake = tokio::select! {
                result = transport.read_buf(read_buf), if !suspended => Wake::Read(result),
                () = sleep_until(deadline) => Wake::Timeout,
            };

            match wake {
                Wake::Read(Ok(0)) => self.protocol.handle_close(),
                Wake::Read(Ok(n)) => {
                    trace!("read {n} bytes");
                    let data = self.read_buf.split();
                    self.protocol.handle_input(&data);
                }
                Wake::Read(Err(e)) => self.protocol.handle_transport_error(e.into()),
                Wake::Timeout => {
                    let now = std::time::Instant::now();
                    self.protocol
                        .handle_timeout(deadline.map_or(now, |deadline| deadline.max(now)));
                }
            }
        }
    }

    /// Carries out queued outputs up to (and including) the first event.
    async fn flush_outputs(&mut self) -> Option<ProtocolEvent> {
        while let Some(output) = self.protocol.poll_output() {
            match output {
                Output::Transmit(transmit) => {
                    if let Err(e) = self.write(transmit.as_ref()).await {
                        self.protocol.handle_transport_error(e);
                    }
                }
                Output::UpgradeTls => self.upgrade().await,
                Output::Close => {
                    if let Some(mut transport) = self.transport.take() {
                        if let Err(e) = transport.shutdown().await {
                            debug!("shutdown failed: {e}");
                        }
                    }
                    self.protocol.handle_close();
                }
                Output::Event(event) => return Some(event),
            }
        }
        None
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::InvalidState("transport is closed".to_string()));
        };
        transport.write_all(data).await?;
        transport.flush().await?;
        Ok(())
    }

    async fn upgrade(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        debug!("upgrading connection to TLS");
        match transport.upgrade_to_secure(self.protocol.config()).await {
            Ok(secure) => self.transport = Some(secure),
            Err(e) => self.protocol.handle_transport_error(e),
        }
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("protocol", &self.protocol)
            .field("connected", &self.transport.is_some())
            .field("suspended", &self.suspended)
            .finish_non_exhaustive()
    }
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
