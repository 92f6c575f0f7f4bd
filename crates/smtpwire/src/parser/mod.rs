//! SMTP response parser.
//!
//! The parser accepts text in arbitrary chunks and assembles complete
//! replies. SMTP replies can be single-line or multi-line:
//!
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! Bare `\n` line endings are accepted as well. Malformed input is reported
//! as a [`ParserEvent::Error`] but never stops the parser: a placeholder
//! reply is still produced so whoever waits for the next reply is not left
//! hanging.

use crate::error::Error;
use crate::types::{ReplyCode, Response};

/// Output of the parser, in input order.
#[derive(Debug)]
pub enum ParserEvent {
    /// A complete reply.
    Response(Response),
    /// Malformed input or misuse of the parser.
    Error(Error),
    /// The parser was finished.
    End,
}

/// Lines of the reply currently being assembled.
#[derive(Debug, Default)]
struct ParseBlock {
    lines: Vec<String>,
    data: Vec<String>,
    status_code: Option<ReplyCode>,
}

/// A line that matched the reply grammar.
struct ReplyLine<'a> {
    code: ReplyCode,
    continuation: bool,
    enhanced_status: Option<&'a str>,
    text: &'a str,
}

/// Incremental SMTP reply parser.
#[derive(Debug, Default)]
pub struct ResponseParser {
    remainder: String,
    block: ParseBlock,
    closed: bool,
}

impl ResponseParser {
    /// Creates a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [`finish`](Self::finish) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds a chunk of text and returns the events it completes.
    ///
    /// The trailing part of the chunk that is not yet terminated by a line
    /// break is held until the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        if self.closed {
            events.push(ParserEvent::Error(Error::Parse(
                "This parser has already been closed, \"write\" is prohibited".into(),
            )));
            return events;
        }

        self.remainder.push_str(chunk);
        let buffered = std::mem::take(&mut self.remainder);
        let mut lines: Vec<&str> = buffered.split('\n').collect();
        // split always yields at least one element
        let tail = lines.pop().unwrap_or_default();
        self.remainder = tail.to_string();

        for line in lines {
            let line = line.strip_suffix('\r').unwrap_or(line);
            self.process_line(line, &mut events);
        }

        events
    }

    /// Feeds an optional last chunk, flushes the unterminated remainder and
    /// closes the parser.
    pub fn finish(&mut self, chunk: Option<&str>) -> Vec<ParserEvent> {
        if self.closed {
            return vec![ParserEvent::Error(Error::Parse(
                "This parser has already been closed, \"end\" is prohibited".into(),
            ))];
        }

        let mut events = chunk.map(|c| self.feed(c)).unwrap_or_default();

        let remainder = std::mem::take(&mut self.remainder);
        if !remainder.is_empty() {
            self.process_line(&remainder, &mut events);
        }

        self.closed = true;
        events.push(ParserEvent::End);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<ParserEvent>) {
        if line.trim().is_empty() {
            return;
        }

        let Some(parsed) = parse_reply_line(line) else {
            events.push(ParserEvent::Error(Error::Parse(format!(
                "Invalid SMTP response \"{line}\""
            ))));
            let code = self.block.status_code.unwrap_or_default();
            events.push(ParserEvent::Response(Response::invalid(code, line)));
            self.block = ParseBlock::default();
            return;
        };

        self.block.lines.push(line.to_string());
        self.block.data.push(parsed.text.to_string());

        if parsed.continuation {
            match self.block.status_code {
                Some(expected) if expected != parsed.code => {
                    events.push(ParserEvent::Error(Error::Parse(format!(
                        "Invalid status code {} for multi line response ({expected} expected)",
                        parsed.code
                    ))));
                }
                Some(_) => {}
                None => self.block.status_code = Some(parsed.code),
            }
            return;
        }

        let block = std::mem::take(&mut self.block);
        events.push(ParserEvent::Response(Response::new(
            parsed.code,
            parsed.enhanced_status.map(str::to_string),
            block.data.join("\n"),
            block.lines.join("\n"),
        )));
    }
}

/// Matches `^(\d{3})([- ])(?:(\d+\.\d+\.\d+) )?(.*)`.
fn parse_reply_line(line: &str) -> Option<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let continuation = match bytes[3] {
        b'-' => true,
        b' ' => false,
        _ => return None,
    };

    let code = ReplyCode::new(line[..3].parse().unwrap_or(0));
    let rest = &line[4..];

    let (enhanced_status, text) = match rest.split_once(' ') {
        Some((candidate, text)) if is_enhanced_status(candidate) => (Some(candidate), text),
        _ => (None, rest),
    };

    Some(ReplyLine {
        code,
        continuation,
        enhanced_status,
        text,
    })
}

/// Checks for `\d+\.\d+\.\d+`.
fn is_enhanced_status(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}
