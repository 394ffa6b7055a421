//! A concurrent HTTP/1.1 file server.
//!
//! `GET` and `PUT` on a flat namespace of URIs, each URI backed by a file under a configured
//! root directory and guarded by its own reader/writer lock so concurrent requests against
//! distinct URIs never block each other, while concurrent requests against the *same* URI are
//! serialized fairly between readers and writers. See [`rwlock`] for the admission policy and
//! [`server`] for how connections move from the listening socket to a handler.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod registry;
pub mod request;
pub mod response;
pub mod rwlock;
pub mod server;
