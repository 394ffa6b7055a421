//! Command-line argument parsing for the `httpserver` binary.
//!
//! Mirrors the original source's `getopt`-based front door: `httpserver [-t worker_count] port`.
//! Argument parsing itself is out of the server's functional scope (§1 Non-goals), so this stays
//! a small hand-rolled parser rather than pulling in a full CLI framework for two flags.

use std::fmt;

/// Parsed command-line arguments.
#[derive(Debug, PartialEq, Eq)]
pub struct Args {
    pub port: u16,
    pub worker_count: usize,
}

/// Why argument parsing failed, paired with the usage text a caller should print alongside it.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    MissingPort,
    InvalidPort(String),
    InvalidWorkerCount(String),
    ZeroWorkerCount,
    UnknownFlag(String),
    MissingValue(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingPort => write!(f, "missing required argument: port"),
            ParseError::InvalidPort(s) => write!(f, "invalid port: {s}"),
            ParseError::InvalidWorkerCount(s) => write!(f, "invalid worker count: {s}"),
            ParseError::ZeroWorkerCount => write!(f, "worker count must be greater than 0"),
            ParseError::UnknownFlag(s) => write!(f, "unknown flag: {s}"),
            ParseError::MissingValue(flag) => write!(f, "missing value for {flag}"),
        }
    }
}

/// Usage text printed on `-h` or on a parse error.
pub const USAGE: &str = "usage: httpserver [-t worker_count] port";

/// Parses `args` (excluding the program name), matching the original's `-t`/`-h` getopt surface.
///
/// Returns `Ok(None)` when `-h` was given, signaling the caller should print [`USAGE`] and exit
/// successfully rather than start the server.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Args>, ParseError> {
    let mut worker_count = crate::config::DEFAULT_WORKER_COUNT;
    let mut port = None;

    let mut iter = args.into_iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" => return Ok(None),
            "-t" => {
                let value = iter.next().ok_or(ParseError::MissingValue("-t"))?;
                worker_count = value
                    .parse()
                    .map_err(|_| ParseError::InvalidWorkerCount(value))?;
            }
            other if other.starts_with('-') => {
                return Err(ParseError::UnknownFlag(other.to_owned()))
            }
            other => {
                port = Some(
                    other
                        .parse()
                        .map_err(|_| ParseError::InvalidPort(other.to_owned()))?,
                );
            }
        }
    }

    let port = port.ok_or(ParseError::MissingPort)?;
    if worker_count == 0 {
        return Err(ParseError::ZeroWorkerCount);
    }
    Ok(Some(Args { port, worker_count }))
}
