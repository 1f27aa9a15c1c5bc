//! Incremental response header parsing.
//!
//! The engine's header callback fires once per physical line. Each line is
//! interpreted according to the current `ReadState`, which only ever moves
//! forward: the first line is the status line, then header lines until an
//! empty one, then everything is body.

use crate::headers::HeaderName;

/// Where the response stream currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadState {
    #[default]
    Status,
    Headers,
    Body,
}

/// What a single header-callback line turned out to be.
#[derive(Debug, PartialEq)]
pub enum LineEvent<'a> {
    /// The status line. Its content is not parsed here.
    Status,
    /// A `Name: value` header line.
    Header(HeaderName, String),
    /// The empty line ending the header block.
    EndOfHeaders,
    /// A header-state line without a colon.
    Dropped,
    /// Bytes delivered after the header block; they belong to the body.
    Body(&'a [u8]),
}

/// Strip the CRLF the engine leaves on every header line.
///
/// Exactly two bytes are removed; shorter input yields an empty line.
pub fn trim_line_ending(raw: &[u8]) -> &[u8] {
    &raw[..raw.len().saturating_sub(2)]
}

/// Consume one raw header-callback line (CRLF included) and advance `state`.
pub fn consume_line<'a>(raw: &'a [u8], state: &mut ReadState) -> LineEvent<'a> {
    match *state {
        ReadState::Status => {
            *state = ReadState::Headers;
            LineEvent::Status
        }
        ReadState::Headers => {
            let line = trim_line_ending(raw);
            if line.is_empty() {
                *state = ReadState::Body;
                return LineEvent::EndOfHeaders;
            }
            match split_header(line) {
                Some((name, value)) => LineEvent::Header(
                    HeaderName::from_standard(&String::from_utf8_lossy(name)),
                    String::from_utf8_lossy(value).into_owned(),
                ),
                None => LineEvent::Dropped,
            }
        }
        ReadState::Body => LineEvent::Body(raw),
    }
}

/// Split at the first colon, skipping one space after it if present.
fn split_header(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = &line[..colon];
    let rest = &line[colon + 1..];
    let value = rest.strip_prefix(b" ").unwrap_or(rest);
    Some((name, value))
}
