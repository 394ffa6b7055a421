//! `GET` and `PUT` handlers: the only code in this crate that touches the filesystem.
//!
//! Both handlers follow the same shape: acquire the per-URI lock in the mode the method
//! requires, do the filesystem work, release the lock, and return the status that was decided —
//! never before the lock is released, so a slow client can't be blamed on a handler holding a
//! lock longer than its own critical section needs.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::response::{self, Status};
use crate::rwlock::RwLock;

/// Bytes per chunk while streaming a file to the client, per §4.E.
const GET_CHUNK: usize = 2048;
/// Bytes per chunk while streaming a request body to a file, per §4.E.
const PUT_CHUNK: usize = 4096;

/// Serves `GET /uri`: streams the file at `uri` to `socket` under a reader admission of `lock`.
///
/// Returns the status that was sent. A failure before the `200` headers go out (missing file,
/// directory target, a stat failure) is translated to the appropriate status and a single status
/// line is written. A failure *after* the `200` headers are already on the wire (the file shrinks
/// mid-stream, the socket write fails) can no longer be reported with a fresh status line without
/// corrupting the response the client has already started receiving, so it is logged and the
/// connection is simply let close; the request is still accounted as `200` since that is the
/// status actually committed to the wire.
pub fn get(
    config: &ServerConfig,
    uri: &str,
    reader: BufReader<TcpStream>,
    lock: &RwLock,
) -> Result<Status> {
    let mut socket = reader.into_inner();
    lock.reader_lock();
    let opened = open_for_get(config, uri);
    let outcome = opened.map(|(mut file, size)| {
        if let Err(e) = stream_get_response(&mut socket, &mut file, size) {
            tracing::warn!(uri, error = %e, "GET body stream failed after 200 headers were sent");
        }
        Status::Ok
    });
    lock.reader_unlock();

    match outcome {
        Ok(status) => Ok(status),
        Err(err) => {
            let status = err.status();
            response::write_fixed(&mut socket, status)?;
            Ok(status)
        }
    }
}

/// Opens `uri` and validates it is a regular file, without writing anything to the wire yet.
fn open_for_get(config: &ServerConfig, uri: &str) -> Result<(File, u64)> {
    let path = config.resolve(uri);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ServerError::NotFound),
        Err(e) => return Err(ServerError::Io(e)),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(ServerError::IsADirectory);
    }

    Ok((file, metadata.len()))
}

/// Writes the `200` header and streams `file` to `socket`. Once this returns `Ok`, the headers
/// (and however much of the body made it out) are irrevocably on the wire; any error here can
/// only be handled by the caller closing the connection, never by writing another status line.
fn stream_get_response(socket: &mut TcpStream, file: &mut File, size: u64) -> io::Result<()> {
    response::write_get_header(socket, size)?;

    let mut sent = 0u64;
    let mut buf = [0u8; GET_CHUNK];
    while sent < size {
        let want = std::cmp::min(buf.len() as u64, size - sent) as usize;
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break; // file shrank under us; send what there was
        }
        socket.write_all(&buf[..n])?;
        sent += n as u64;
    }

    Ok(())
}

/// Serves `PUT /uri`: writes exactly `content_length` bytes read from `body` to the file at
/// `uri` under a writer admission of `lock`, creating it if absent.
pub fn put(
    config: &ServerConfig,
    uri: &str,
    mut body: BufReader<TcpStream>,
    content_length: u64,
    lock: &RwLock,
) -> Result<Status> {
    lock.writer_lock();
    let result = put_locked(config, uri, &mut body, content_length);
    lock.writer_unlock();

    let mut socket = body.into_inner();
    let status = result.unwrap_or_else(|err| err.status());
    match status {
        Status::Ok | Status::Created => response::write_put_result(&mut socket, status)?,
        other => response::write_fixed(&mut socket, other)?,
    }
    Ok(status)
}

fn put_locked(
    config: &ServerConfig,
    uri: &str,
    body: &mut BufReader<TcpStream>,
    content_length: u64,
) -> Result<Status> {
    let path = config.resolve(uri);
    let (mut file, status) = open_for_put(&path)?;

    // Read exactly `content_length` bytes, tracking total bytes actually written rather than a
    // chunk counter (the original source compares against the latter, a bug fixed here per §9).
    let mut buf = [0u8; PUT_CHUNK];
    let mut total_written = 0u64;
    while total_written < content_length {
        let want = std::cmp::min(buf.len() as u64, content_length - total_written) as usize;
        let n = body.read(&mut buf[..want])?;
        if n == 0 {
            break; // client closed early; truncate the body at what was received (§4.E, §9)
        }
        file.write_all(&buf[..n])?;
        total_written += n as u64;
    }

    Ok(status)
}

/// Opens `path` for a `PUT`, choosing between overwrite (`200`) and create (`201`) the way §4.E
/// describes.
///
/// A write-mode open of an existing directory fails at `open()` itself (`EISDIR`) on POSIX
/// systems — it never returns `Ok(file)` — so the directory case can't be caught by inspecting
/// the result of that open. `metadata` is checked first instead: if the target exists and is a
/// directory, `403` is returned before any write-mode open is attempted; otherwise the existing
/// overwrite-or-create sequence proceeds unchanged.
fn open_for_put(path: &std::path::Path) -> Result<(File, Status)> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_dir() {
                return Err(ServerError::IsADirectory);
            }
            let file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(path)
                .map_err(ServerError::Io)?;
            Ok((file, Status::Ok))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let file = create_with_mode(path)?;
            Ok((file, Status::Created))
        }
        Err(e) => Err(ServerError::Io(e)),
    }
}

#[cfg(unix)]
fn create_with_mode(path: &std::path::Path) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .mode(0o666)
        .open(path)
        .map_err(ServerError::Io)
}

#[cfg(not(unix))]
fn create_with_mode(path: &std::path::Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .map_err(ServerError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LockRegistry;
    use std::io::Read as _;
    use std::net::{TcpListener, TcpStream};
    use tempfile::tempdir;

    fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn put_creates_then_get_returns_same_bytes() {
        let dir = tempdir().unwrap();
        let config = ServerConfig {
            port: 0,
            worker_count: 1,
            root_dir: dir.path().to_path_buf(),
        };
        let registry = LockRegistry::new();
        let lock = registry.find_or_create("a");

        let (mut client, server) = loopback_pair();
        client.write_all(b"hello").unwrap();
        drop(client); // EOF after the body so put() doesn't block waiting for more
        let reader = BufReader::new(server);
        let status = put(&config, "a", reader, 5, &lock).unwrap();
        assert!(matches!(status, Status::Created));

        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"hello");

        let (client2, server2) = loopback_pair();
        drop(client2);
        let reader2 = BufReader::new(server2);
        let status2 = get(&config, "a", reader2, &lock).unwrap();
        assert!(matches!(status2, Status::Ok));
    }

    #[test]
    fn get_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let config = ServerConfig {
            port: 0,
            worker_count: 1,
            root_dir: dir.path().to_path_buf(),
        };
        let registry = LockRegistry::new();
        let lock = registry.find_or_create("missing");

        let (client, server) = loopback_pair();
        drop(client);
        let reader = BufReader::new(server);
        let status = get(&config, "missing", reader, &lock).unwrap();
        assert!(matches!(status, Status::NotFound));
    }

    #[test]
    fn get_on_a_directory_is_forbidden() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let config = ServerConfig {
            port: 0,
            worker_count: 1,
            root_dir: dir.path().to_path_buf(),
        };
        let registry = LockRegistry::new();
        let lock = registry.find_or_create("subdir");

        let (client, server) = loopback_pair();
        drop(client);
        let reader = BufReader::new(server);
        let status = get(&config, "subdir", reader, &lock).unwrap();
        assert!(matches!(status, Status::Forbidden));
    }

    #[test]
    fn put_onto_a_directory_is_forbidden() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let config = ServerConfig {
            port: 0,
            worker_count: 1,
            root_dir: dir.path().to_path_buf(),
        };
        let registry = LockRegistry::new();
        let lock = registry.find_or_create("subdir");

        let (client, server) = loopback_pair();
        drop(client);
        let reader = BufReader::new(server);
        let status = put(&config, "subdir", reader, 0, &lock).unwrap();
        assert!(matches!(status, Status::Forbidden));
    }
}
