//! Line-oriented HTTP/1.1 request parsing.
//!
//! The parser never looks at the request as a whole buffer; it reads the request line and each
//! header line one at a time off the socket, validating each against a small regular expression,
//! and stops as soon as it has everything [`ParsedRequest`] needs. This mirrors the state machine
//! in §4.D of the spec: `READ_REQUEST_LINE → CHECK_METHOD → READ_REQUEST_ID → [READ_CONTENT_LENGTH]
//! → DRAIN_HEADERS`.

use std::io::{BufRead, BufReader, Read};

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, ServerError};

/// Upper bound on the request line, in bytes, matching the original source's fixed buffer.
pub const MAX_REQUEST_LINE: usize = 256;
/// Upper bound on any single header line, in bytes.
pub const MAX_HEADER_LINE: usize = 2048;
/// Defensive cap on the number of header lines drained after the ones the core consumes, so a
/// client that never sends a blank line can't hold a worker forever one short line at a time.
pub const MAX_DRAINED_HEADERS: usize = 100;

fn request_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z]{1,8}) +(/[A-Za-z0-9._]{1,63}) +(HTTP/[0-9]\.[0-9])$").unwrap()
    })
}

fn header_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([!#$%&'*+\-.^_`|~0-9A-Za-z]+): *(.*)$").unwrap())
}

/// The two methods this server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// A fully validated request, ready for dispatch to a handler.
#[derive(Debug)]
pub struct ParsedRequest {
    pub method: Method,
    /// The path component with the leading `/` stripped, e.g. `"a"` for `/a`.
    pub uri: String,
    pub request_id: u64,
    /// `Some` only for `PUT`.
    pub content_length: Option<u64>,
}

/// Reads length-capped, terminator-delimited lines off a socket.
///
/// Thin wrapper over [`BufReader`] that enforces the §4.D line-length caps and turns a cap
/// overrun or a short read before the terminator into a [`ServerError`], rather than silently
/// returning a truncated line the way a bare `read_until` would.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Reads one line terminated by `\n` (an immediately preceding `\r` is stripped), enforcing
    /// `max_len` on the line excluding its terminator.
    fn read_line(&mut self, max_len: usize, what: &'static str) -> Result<String> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if buf.len() >= max_len {
                return Err(ServerError::LineTooLong(what));
            }
            let n = self.inner.read(&mut byte)?;
            if n == 0 {
                return Err(ServerError::Truncated(what));
            }
            if byte[0] == b'\n' {
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                return String::from_utf8(buf).map_err(|_| ServerError::Malformed(what));
            }
            buf.push(byte[0]);
        }
    }

    /// Gives back the underlying reader, e.g. to stream a `PUT` body off of it directly.
    pub fn into_inner(self) -> BufReader<R> {
        self.inner
    }
}

/// Parses a single request per §4.D, reading exactly as much of the socket as the state machine
/// requires and no more (the body, if any, is left for the caller to read).
pub fn parse_request<R: Read>(reader: &mut LineReader<R>) -> Result<ParsedRequest> {
    let line = reader.read_line(MAX_REQUEST_LINE, "request line")?;
    let captures = request_line_re()
        .captures(&line)
        .ok_or(ServerError::Malformed("request line"))?;

    let method_token = &captures[1];
    let uri = captures[2].trim_start_matches('/').to_owned();
    let version = &captures[3];

    // The original source evaluates the method and the version independently and lets a bad
    // version overwrite a bad method's tentative status; preserved here for parity (§9).
    let mut tentative_error = None;
    let method = match method_token {
        "GET" => Some(Method::Get),
        "PUT" => Some(Method::Put),
        other => {
            tentative_error = Some(ServerError::UnsupportedMethod(other.to_owned()));
            None
        }
    };
    if version != "HTTP/1.1" {
        tentative_error = Some(ServerError::UnsupportedVersion(version.to_owned()));
    }
    if let Some(err) = tentative_error {
        return Err(err);
    }
    let method = method.expect("method is Some whenever tentative_error is None");

    let request_id = read_required_header(reader, "Request-Id")?;

    let content_length = match method {
        Method::Put => Some(read_required_header(reader, "Content-Length")?),
        Method::Get => None,
    };

    drain_headers(reader)?;

    Ok(ParsedRequest {
        method,
        uri,
        request_id,
        content_length,
    })
}

/// Reads one header line, requires its key to equal `name`, and parses its value as a
/// non-negative integer.
fn read_required_header<R: Read>(reader: &mut LineReader<R>, name: &'static str) -> Result<u64> {
    let line = reader.read_line(MAX_HEADER_LINE, name)?;
    let captures = header_line_re()
        .captures(&line)
        .ok_or(ServerError::Malformed(name))?;

    if &captures[1] != name {
        return Err(ServerError::Malformed(name));
    }
    captures[2]
        .trim()
        .parse::<u64>()
        .map_err(|_| ServerError::Malformed(name))
}

/// Reads and discards header lines the core doesn't inspect, up to the blank line that ends the
/// header block.
fn drain_headers<R: Read>(reader: &mut LineReader<R>) -> Result<()> {
    for _ in 0..MAX_DRAINED_HEADERS {
        let line = reader.read_line(MAX_HEADER_LINE, "header")?;
        if line.is_empty() {
            return Ok(());
        }
    }
    Err(ServerError::Malformed("too many headers"))
}
