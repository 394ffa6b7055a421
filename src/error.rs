//! Error taxonomy for the request-serving core.
//!
//! Every fallible operation in this crate that can be observed by a client resolves to one of
//! the wire status codes in [`crate::response::Status`]. `ServerError` is the single type that
//! carries that information from wherever it's first detected (parsing, lock acquisition,
//! filesystem access) up to the point a response is written, so handler code can propagate with
//! `?` instead of hand-rolling a status code at every call site.

use std::io;

use thiserror::Error;

use crate::response::Status;

/// Errors produced while servicing a single request.
///
/// Every variant maps to exactly one wire status via [`ServerError::status`]; none of them are
/// fatal to the worker thread that produced them; the worker logs, responds, and moves on to its
/// next job.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request line or a header line didn't match the grammar in the request parser.
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    /// A line exceeded its length cap without reaching its terminator.
    #[error("line too long while reading {0}")]
    LineTooLong(&'static str),

    /// The socket closed or a short read occurred before a terminator was found.
    #[error("truncated read while reading {0}")]
    Truncated(&'static str),

    /// The method was syntactically valid but isn't one this server implements.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// The request declared an HTTP version other than 1.1.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// `GET` target does not exist.
    #[error("not found")]
    NotFound,

    /// Target exists but is not a regular file.
    #[error("target is a directory")]
    IsADirectory,

    /// Any other I/O failure while touching the filesystem or socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    /// Maps this error to the wire status a client should see.
    pub fn status(&self) -> Status {
        match self {
            ServerError::Malformed(_) => Status::BadRequest,
            ServerError::LineTooLong(_) => Status::BadRequest,
            ServerError::Truncated(_) => Status::BadRequest,
            ServerError::UnsupportedMethod(_) => Status::NotImplemented,
            ServerError::UnsupportedVersion(_) => Status::VersionNotSupported,
            ServerError::NotFound => Status::NotFound,
            ServerError::IsADirectory => Status::Forbidden,
            ServerError::Io(_) => Status::InternalServerError,
        }
    }
}

/// Result alias used throughout the request path.
pub type Result<T> = std::result::Result<T, ServerError>;
