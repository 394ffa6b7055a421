//! Binary entry point: parses arguments, binds the listener, and runs the server.

use std::net::TcpListener;
use std::process::ExitCode;

use latchd::cli::{self, USAGE};
use latchd::config::ServerConfig;
use latchd::server;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match cli::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            // §6: invalid usage prints its diagnostic to standard output, matching the original
            // source's fprintf(stdout, ...) on every parse failure.
            println!("httpserver: {err}");
            println!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let root_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("httpserver: failed to read current directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        port: args.port,
        worker_count: args.worker_count,
        root_dir,
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.port)) {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("httpserver: failed to bind port {}: {err}", config.port);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(port = config.port, workers = config.worker_count, "starting");
    match server::run(listener, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("httpserver: fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
