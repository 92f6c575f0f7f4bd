//! Integration tests for the SMTP client.
//!
//! These tests drive whole sessions through [`Client`] over a scripted mock
//! transport, without requiring a real server connection.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_test::io::{Builder, Mock};

use smtpwire::parser::{ParserEvent, ResponseParser};
use smtpwire::{
    Client, Config, Credentials, Envelope, Error, Output, Protocol, ProtocolEvent, Transport,
};

/// Scripted transport; the TLS upgrade keeps talking to the same script.
struct MockTransport {
    inner: Mock,
    fail_upgrade: bool,
}

impl MockTransport {
    fn new(inner: Mock) -> Self {
        Self {
            inner,
            fail_upgrade: false,
        }
    }
}

impl Transport for MockTransport {
    async fn upgrade_to_secure(self, _config: &Config) -> smtpwire::Result<Self> {
        if self.fail_upgrade {
            return Err(Error::Io(io::Error::other("handshake failed")));
        }
        Ok(self)
    }
}

impl AsyncRead for MockTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

fn client(mock: Mock, config: Config) -> Client<MockTransport> {
    Client::new(MockTransport::new(mock), config)
}

/// Runs a session that sends one message and quits, returning every event.
async fn send_one(
    client: &mut Client<MockTransport>,
    envelope: &Envelope,
    body: &str,
) -> Vec<ProtocolEvent> {
    let mut events = Vec::new();
    while let Some(event) = client.next_event().await.unwrap() {
        match &event {
            ProtocolEvent::Idle => client.use_envelope(envelope.clone()),
            ProtocolEvent::Ready { .. } => {
                client.end(Some(body));
            }
            ProtocolEvent::Done { .. } => client.quit(),
            _ => {}
        }
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_session_with_auth_plain() {
    let mock = Builder::new()
        .read(b"220 mx.example.com ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250-mx.example.com\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1024\r\n")
        .write(b"AUTH PLAIN AGFiYwBkZWY=\r\n")
        .read(b"235 2.7.0 Accepted\r\n")
        .write(b"MAIL FROM:<a@x>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@y>\r\n")
        .read(b"550 5.1.1 unknown user\r\n")
        .write(b"RCPT TO:<c@z>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"Subject: hi\r\n\r\n..dot\r\n.\r\n")
        .read(b"250 2.0.0 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();

    let config = Config::builder("mx.example.com")
        .auth(Credentials::password("abc", "def"))
        .build();
    let mut client = client(mock, config);
    let envelope = Envelope::new("a@x", ["b@y", "c@z"]);

    let events = send_one(&mut client, &envelope, "Subject: hi\r\n\r\n.dot\r\n").await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], ProtocolEvent::Idle));
    match &events[1] {
        ProtocolEvent::Ready { failed_recipients } => {
            assert_eq!(failed_recipients, &["b@y".to_string()]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(events[2], ProtocolEvent::Done { success: true }));
    assert!(matches!(events[3], ProtocolEvent::Closed));

    let protocol = client.protocol();
    assert_eq!(protocol.authenticated_as(), Some("abc"));
    assert_eq!(protocol.max_allowed_size(), Some(1024));
    assert!(protocol.is_destroyed());
}

#[tokio::test]
async fn test_starttls_upgrade() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250-mx\r\n250 STARTTLS\r\n")
        .write(b"STARTTLS\r\n")
        .read(b"220 2.0.0 ready\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250-mx\r\n250 AUTH PLAIN\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();
    let mut client = client(mock, Config::new("mx"));

    let event = client.next_event().await.unwrap();
    assert!(matches!(event, Some(ProtocolEvent::Idle)));
    assert!(client.protocol().is_secure());

    client.quit();
    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Closed)
    ));
    assert!(client.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_starttls_handshake_failure() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 STARTTLS\r\n")
        .write(b"STARTTLS\r\n")
        .read(b"220 ready\r\n")
        .build();
    let transport = MockTransport {
        inner: mock,
        fail_upgrade: true,
    };
    let mut client = Client::new(transport, Config::new("mx"));

    match client.next_event().await.unwrap() {
        Some(ProtocolEvent::Error(e)) => assert_eq!(e.to_string(), "I/O error: handshake failed"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Closed)
    ));
    assert!(client.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_lmtp_delivery_statuses() {
    let mock = Builder::new()
        .read(b"220 lmtp.local LMTP\r\n")
        .write(b"LHLO localhost\r\n")
        .read(b"250 lmtp.local\r\n")
        .write(b"MAIL FROM:<a@x>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@y>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<c@z>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"body\r\n.\r\n")
        .read(b"250 2.0.0 <b@y> delivered\r\n452 4.2.2 <c@z> mailbox full\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 bye\r\n")
        .build();
    let config = Config::builder("lmtp.local").lmtp(true).build();
    let mut client = client(mock, config);
    let envelope = Envelope::new("a@x", ["b@y", "c@z"]);

    let events = send_one(&mut client, &envelope, "body\r\n").await;

    assert!(matches!(
        events.as_slice(),
        [
            ProtocolEvent::Idle,
            ProtocolEvent::Ready { .. },
            ProtocolEvent::Done { success: true },
            ProtocolEvent::Closed
        ]
    ));
    assert_eq!(
        client.protocol().envelope().rcpt_failed(),
        &["c@z".to_string()]
    );
}

#[tokio::test]
async fn test_all_recipients_rejected() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 mx\r\n")
        .write(b"MAIL FROM:<a@x>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@y>\r\n")
        .read(b"550 no such user\r\n")
        .build();
    let mut client = client(mock, Config::new("mx"));
    let envelope = Envelope::new("a@x", ["b@y"]);

    let events = send_one(&mut client, &envelope, "unused").await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ProtocolEvent::Idle));
    match &events[1] {
        ProtocolEvent::Error(e) => {
            assert_eq!(e.to_string(), "Can't send mail - all recipients were rejected");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(events[2], ProtocolEvent::Closed));
}

#[tokio::test]
async fn test_server_closes_connection() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .build();
    let mut client = client(mock, Config::new("mx"));

    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Closed)
    ));
    assert!(client.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_idle_timeout() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .wait(Duration::from_secs(5))
        .build();
    let config = Config::builder("mx")
        .timeout(Duration::from_millis(50), 0.0)
        .build();
    let mut client = client(mock, config);

    match client.next_event().await.unwrap() {
        Some(ProtocolEvent::Error(e)) => {
            assert!(e.is_timeout());
            assert_eq!(e.to_string(), "Socket timed out!");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Closed)
    ));
}

#[tokio::test]
async fn test_suspended_without_deadline() {
    let mock = Builder::new()
        .read(b"220 mx ESMTP\r\n")
        .write(b"EHLO localhost\r\n")
        .read(b"250 mx\r\n")
        .build();
    let mut client = client(mock, Config::new("mx"));

    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Idle)
    ));

    client.suspend();
    assert!(client.is_suspended());
    assert!(matches!(
        client.next_event().await,
        Err(Error::InvalidState(_))
    ));

    client.resume();
    client.close();
    assert!(matches!(
        client.next_event().await.unwrap(),
        Some(ProtocolEvent::Closed)
    ));
}

/// Collects every byte the protocol wants written.
fn transmitted(protocol: &mut Protocol) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(output) = protocol.poll_output() {
        if let Output::Transmit(t) = output {
            out.extend_from_slice(t.as_ref());
        }
    }
    out
}

/// A protocol that has just entered data mode.
fn in_data_mode() -> Protocol {
    let mut protocol = Protocol::new(Config::new("mx"));
    protocol.handle_open();
    protocol.handle_input(b"220 mx\r\n250 mx\r\n");
    protocol.use_envelope(Envelope::new("a@x", ["b@y"]));
    protocol.handle_input(b"250 OK\r\n250 OK\r\n354 go\r\n");
    transmitted(&mut protocol);
    protocol
}

fn replies(events: Vec<ParserEvent>) -> Vec<(u16, String, String)> {
    events
        .into_iter()
        .filter_map(|e| match e {
            ParserEvent::Response(r) => Some((r.code(), r.data, r.line)),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn body_chunking_does_not_change_wire_bytes(
        content in "[x.\r\n]{0,64}",
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(content.len() + 1);

        let mut whole = in_data_mode();
        whole.send(&content);
        whole.end(None);

        let mut chunked = in_data_mode();
        chunked.send(&content[..at]);
        chunked.send(&content[at..]);
        chunked.end(None);

        prop_assert_eq!(transmitted(&mut whole), transmitted(&mut chunked));
    }

    #[test]
    fn reply_chunking_does_not_change_replies(
        text in "(25[0-9][- ](2\\.1\\.[0-9] )?[a-z ]{0,8}\r?\n){1,6}",
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(text.len() + 1);

        let mut whole = ResponseParser::new();
        let expected = replies(whole.feed(&text));

        let mut chunked = ResponseParser::new();
        let mut actual = replies(chunked.feed(&text[..at]));
        actual.extend(replies(chunked.feed(&text[at..])));

        prop_assert_eq!(expected, actual);
    }
}
