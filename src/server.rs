//! The dispatcher: accepts connections and hands them to a fixed pool of worker threads.
//!
//! One thread blocks in `TcpListener::accept()` and pushes every accepted connection onto a
//! bounded [`crate::queue`]; `config.worker_count` worker threads each loop pulling connections
//! off that queue, parsing one request, dispatching it to [`crate::handlers`], and closing the
//! connection. There is no keep-alive: every connection serves exactly one request, matching
//! §3 and §4.A.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::queue::{self, JobReceiver, JobSender};
use crate::registry::LockRegistry;
use crate::request::{self, LineReader, Method, ParsedRequest};
use crate::response::{self, Status};
use crate::{audit, handlers};

/// Shared, read-only state every worker thread needs.
struct Context {
    config: ServerConfig,
    registry: LockRegistry,
}

/// Runs the server until `listener` stops producing connections (which, barring an
/// unrecoverable OS-level failure, is never under normal operation).
///
/// Spawns `config.worker_count` worker threads, then blocks the calling thread in the accept
/// loop. Returns only if the accept loop itself fails fatally.
pub fn run(listener: TcpListener, config: ServerConfig) -> std::io::Result<()> {
    let worker_count = config.worker_count.max(1);
    let context = Arc::new(Context {
        config,
        registry: LockRegistry::new(),
    });

    // Capacity equals the worker count (§3): once every worker is busy and the queue is full,
    // `push` blocks the dispatcher, which stops calling `accept()` — the backpressure mechanism
    // described in §4.F/§5.
    let (tx, rx) = queue::bounded(worker_count);

    let mut workers = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        let rx = rx.clone();
        let context = context.clone();
        workers.push(
            thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker_loop(id, rx, context))
                .expect("failed to spawn worker thread"),
        );
    }

    let result = accept_loop(listener, tx);

    // Dropping every sender unblocks workers waiting on an empty queue so they can exit cleanly;
    // `tx` in `accept_loop`'s scope already went out of scope with it, so join is all that's left.
    for worker in workers {
        let _ = worker.join();
    }

    result
}

fn accept_loop(listener: TcpListener, tx: JobSender) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "listening");
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if tx.push(stream).is_err() {
                    // Receivers are gone; nothing left to do.
                    return Ok(());
                }
                tracing::debug!(?peer, "accepted connection");
            }
            Err(e) => {
                // A single failed accept (e.g. a transient resource limit) is not fatal to the
                // server; log it and keep serving other connections.
                error!(error = %e, "accept failed");
            }
        }
    }
}

fn worker_loop(id: usize, rx: JobReceiver, context: Arc<Context>) {
    let request_counter = AtomicU64::new(0);
    while let Some(stream) = rx.pop() {
        let request_id_for_log = request_counter.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = serve_one(&context, stream) {
            warn!(worker = id, request = request_id_for_log, error = %e, "connection failed");
        }
    }
}

/// Parses and serves exactly one request off `stream`, then lets `stream` close on drop.
fn serve_one(context: &Context, stream: TcpStream) -> std::io::Result<()> {
    let mut line_reader = LineReader::new(stream);

    let parsed = match request::parse_request(&mut line_reader) {
        Ok(parsed) => parsed,
        Err(err) => {
            let status = err.status();
            let mut socket = line_reader.into_inner().into_inner();
            response::write_fixed(&mut socket, status)?;
            return Ok(());
        }
    };

    dispatch(context, line_reader, parsed)
}

fn dispatch(
    context: &Context,
    line_reader: LineReader<TcpStream>,
    parsed: ParsedRequest,
) -> std::io::Result<()> {
    let ParsedRequest {
        method,
        uri,
        request_id,
        content_length,
    } = parsed;

    let lock = context.registry.find_or_create(&uri);
    let reader = line_reader.into_inner();

    let status = match method {
        Method::Get => handlers::get(&context.config, &uri, reader, &lock),
        Method::Put => {
            let content_length = content_length.unwrap_or(0);
            handlers::put(&context.config, &uri, reader, content_length, &lock)
        }
    };

    let status = status.unwrap_or(Status::InternalServerError);
    audit::record(method, &uri, status, request_id);
    Ok(())
}
