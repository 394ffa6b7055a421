// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire-level response status codes and their fixed bodies.
//!
//! This server answers with exactly nine statuses, each with a literal, pre-determined body
//! (except `200 OK` on `GET`, whose body is the requested file). Keeping the table here, rather
//! than building response bytes ad-hoc in each handler, is what lets §8's "response
//! well-formedness" property be checked against a single source of truth.

use std::{
    fmt::Display,
    io::{self, Write},
};

/// The handful of statuses this server ever emits.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `GET` succeeded or `PUT` overwrote an existing file.
    Ok = 200,
    /// `PUT` created a new file.
    Created = 201,
    /// Malformed request line, header line, or truncated read.
    BadRequest = 400,
    /// Target exists but is not a regular file.
    Forbidden = 403,
    /// `GET` target does not exist.
    NotFound = 404,
    /// Unhandled I/O or stat failure.
    InternalServerError = 500,
    /// Method other than `GET`/`PUT`.
    NotImplemented = 501,
    /// HTTP version other than `1.1`.
    VersionNotSupported = 505,
}

impl Status {
    /// The reason phrase that follows the numeric code on the status line.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
            Status::VersionNotSupported => "Version Not Supported",
        }
    }

    /// The literal body for statuses whose body never depends on request data.
    ///
    /// Returns `None` for `200 OK`, since a `GET`'s 200 body is the file contents and a `PUT`'s
    /// 200 body (`"OK\n"`) is handled as a special case by the caller alongside `Created`.
    fn fixed_body(self) -> Option<&'static [u8]> {
        match self {
            Status::BadRequest => Some(b"Bad Request\n"),
            Status::Forbidden => Some(b"Forbidden\n"),
            Status::NotFound => Some(b"Not Found\n"),
            Status::InternalServerError => Some(b"Internal Server Error\n"),
            Status::NotImplemented => Some(b"Not Implemented\n"),
            Status::VersionNotSupported => Some(b"Version Not Supported\n"),
            Status::Ok | Status::Created => None,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", *self as u16, self.reason())
    }
}

/// Writes a complete status-line + `Content-Length` + blank-line + body response.
///
/// Used for every status except `200 OK` on `GET`, whose body streams from a file rather than
/// from a fixed byte slice (see [`crate::handlers::get`]).
pub fn write_fixed<W: Write>(writer: &mut W, status: Status) -> io::Result<()> {
    let body = status
        .fixed_body()
        .unwrap_or(b"OK\n" as &[u8]);
    write_status_and_body(writer, status, body)
}

/// Writes the `PUT` success response body (`"OK\n"` or `"Created\n"`) for the given status.
///
/// `status` must be [`Status::Ok`] or [`Status::Created`]; any other value falls back to the
/// generic fixed-body table via [`write_fixed`].
pub fn write_put_result<W: Write>(writer: &mut W, status: Status) -> io::Result<()> {
    match status {
        Status::Ok => write_status_and_body(writer, status, b"OK\n"),
        Status::Created => write_status_and_body(writer, status, b"Created\n"),
        other => write_fixed(writer, other),
    }
}

/// Writes the status line and `Content-Length` header for a `GET` whose body is `size` bytes of
/// file content that the caller streams separately.
pub fn write_get_header<W: Write>(writer: &mut W, size: u64) -> io::Result<()> {
    write!(
        writer,
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n",
        Status::Ok,
        size
    )
}

fn write_status_and_body<W: Write>(writer: &mut W, status: Status, body: &[u8]) -> io::Result<()> {
    write!(
        writer,
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n",
        status,
        body.len()
    )?;
    writer.write_all(body)
}
