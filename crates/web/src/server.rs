#![forbid(unsafe_code)]

use crate::config::Settings;
use crate::http::{read_request, write_response};
use crate::views;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use td_storage::SqliteStore;

const IO_TIMEOUT: Duration = Duration::from_secs(2);
const ACCEPT_IDLE: Duration = Duration::from_millis(25);

/// Serves one connection at a time from a single store connection.
pub struct Server {
    listener: TcpListener,
    store: SqliteStore,
    settings: Settings,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn bind(store: SqliteStore, settings: Settings) -> std::io::Result<Self> {
        let listener = TcpListener::bind(settings.bind.as_str())?;
        Ok(Self::from_listener(listener, store, settings))
    }

    pub fn from_listener(listener: TcpListener, store: SqliteStore, settings: Settings) -> Self {
        Self {
            listener,
            store,
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Setting the returned flag stops [`Server::run`] after the current connection.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run(self) -> std::io::Result<()> {
        self.listener.set_nonblocking(true)?;
        tracing::info!(addr = %self.local_addr()?, "listening");
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(err) = handle_connection(stream, &self.store, &self.settings) {
                        tracing::debug!("connection error: {err}");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_IDLE);
                }
                Err(err) => {
                    tracing::warn!("accept failed: {err}");
                }
            }
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

fn handle_connection(
    mut stream: TcpStream,
    store: &SqliteStore,
    settings: &Settings,
) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
    let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

    let Some(request) = read_request(&mut stream)? else {
        return Ok(());
    };

    let response = views::dispatch(&request, store, settings);
    tracing::debug!(
        method = %request.method,
        path = request.path(),
        status = response.status.code(),
        "request"
    );
    write_response(&mut stream, &response, request.is_head())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn serves_until_shutdown() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let store = SqliteStore::open_in_memory().expect("store");
        let server = Server::from_listener(listener, store, Settings::default());
        let addr = server.local_addr().expect("addr");
        let shutdown = server.shutdown_handle();
        let handle = std::thread::spawn(move || server.run());

        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .write_all(b"HEAD / HTTP/1.1\r\nHost: testserver\r\n\r\n")
            .expect("write");
        let mut reply = String::new();
        stream.read_to_string(&mut reply).expect("read");
        assert!(reply.starts_with("HTTP/1.1 302 Found\r\n"));
        assert!(reply.contains("Location: /tracks/\r\n"));

        shutdown.store(true, Ordering::Relaxed);
        handle.join().expect("join").expect("run");
    }
}
