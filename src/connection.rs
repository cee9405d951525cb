//! The connection façade: `connect`, `execute`, `close`, and status accessors.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::Mutex;

use crate::buffer::WriteBuffer;
use crate::engine::{Engine, Event};
use crate::error::{Error, Result};
use crate::opts::ConnectOpts;
use crate::protocol::codec::{Codec, TakeResult};
use crate::protocol::types::TransactionStatus;
use crate::row::Response;
use crate::value::Param;

const SOCKET_DISCOVERY_DIRS: [&str; 2] = ["/var/run/postgresql", "/tmp"];
const READ_CHUNK: usize = 8192;

/// Runs `connect` under `timeout`, if given; `None` means wait indefinitely,
/// matching libpq's own default.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    connect: impl std::future::Future<Output = std::io::Result<T>>,
) -> Result<T> {
    match timeout {
        Some(duration) => tokio::time::timeout(duration, connect)
            .await
            .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out")))?
            .map_err(Error::Io),
        None => connect.await.map_err(Error::Io),
    }
}

/// Anything the engine can speak the wire protocol over: a real socket, or
/// (in tests) an in-memory duplex standing in for a server.
trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
    Other(Box<dyn Transport>),
}

impl Stream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf).await,
            Stream::Unix(s) => s.read(buf).await,
            Stream::Other(s) => s.read(buf).await,
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(s) => s.write_all(buf).await,
            Stream::Unix(s) => s.write_all(buf).await,
            Stream::Other(s) => s.write_all(buf).await,
        }
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(s) => s.shutdown().await,
            Stream::Unix(s) => s.shutdown().await,
            Stream::Other(s) => s.shutdown().await,
        }
    }
}

struct Session {
    stream: Stream,
    codec: Codec,
    engine: Engine,
    write_buf: WriteBuffer,
}

impl Session {
    /// Read and feed frames to the engine until it reports a terminal event,
    /// writing any bytes the engine produces in response (e.g. a password
    /// message) as soon as they're ready.
    ///
    /// Any error — a malformed frame, an engine protocol violation, or a
    /// transport failure — is a wire-contract violation. Once one happens,
    /// the connection can't be trusted for further requests, so the engine
    /// is forced fatal and the stream is shut down here, before the error
    /// reaches the caller.
    async fn drive(&mut self) -> Result<Event> {
        let result = self.drive_until_terminal().await;
        if result.is_err() {
            self.engine.mark_fatal();
            let _ = self.stream.shutdown().await;
        }
        result
    }

    async fn drive_until_terminal(&mut self) -> Result<Event> {
        loop {
            match self.codec.take_message()? {
                TakeResult::Message { type_byte, payload } => {
                    let out = self.write_buf.borrow();
                    let event = self.engine.feed(type_byte, payload, out)?;
                    if !out.is_empty() {
                        self.stream.write_all(out).await?;
                    }
                    match event {
                        Event::Continue => continue,
                        terminal => return Ok(terminal),
                    }
                }
                TakeResult::NeedMore => {
                    let mut chunk = [0u8; READ_CHUNK];
                    let n = self.stream.read(&mut chunk).await?;
                    if n == 0 {
                        return Err(Error::ConnectionBroken);
                    }
                    self.codec.feed(&chunk[..n]);
                }
            }
        }
    }
}

/// An open PostgreSQL connection.
///
/// `execute` serializes concurrent callers through an internal mutex; only
/// one request is ever in flight.
pub struct Connection {
    session: Mutex<Session>,
}

impl Connection {
    /// Open a TCP or Unix-socket connection and run the startup/auth handshake.
    pub async fn connect(opts: ConnectOpts) -> Result<Self> {
        let stream = Self::open_stream(&opts).await?;
        Self::handshake(stream, opts).await
    }

    /// Run the startup handshake over an already-connected transport.
    ///
    /// Not part of the wire-level public surface of a real deployment, but
    /// the seam the test harness uses to stand an in-memory duplex stream
    /// in for a server.
    pub async fn connect_with<S>(stream: S, opts: ConnectOpts) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::handshake(Stream::Other(Box::new(stream)), opts).await
    }

    async fn handshake(stream: Stream, opts: ConnectOpts) -> Result<Self> {
        let mut session = Session { stream, codec: Codec::new(), engine: Engine::new(&opts), write_buf: WriteBuffer::new() };

        let out = session.write_buf.borrow();
        session.engine.start_startup(&opts, out);
        session.stream.write_all(out).await?;

        match session.drive().await? {
            Event::StartupComplete => Ok(Self { session: Mutex::new(session) }),
            _ => Err(Error::Protocol("unexpected event during startup".into())),
        }
    }

    async fn open_stream(opts: &ConnectOpts) -> Result<Stream> {
        let timeout = opts.connect_timeout;

        if let Some(dir) = &opts.socket_dir {
            return Self::connect_unix(dir, opts.port, timeout).await;
        }

        if let Some(host) = &opts.host {
            return if let Some(dir) = host.strip_prefix('/').map(|_| host.as_str()) {
                Self::connect_unix(dir, opts.port, timeout).await
            } else {
                Self::connect_tcp(host, opts.port, timeout).await
            };
        }

        for dir in SOCKET_DISCOVERY_DIRS {
            let path = format!("{dir}/.s.PGSQL.{}", opts.port);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Self::connect_unix(dir, opts.port, timeout).await;
            }
        }
        Self::connect_tcp("localhost", opts.port, timeout).await
    }

    async fn connect_tcp(host: &str, port: u16, timeout: Option<Duration>) -> Result<Stream> {
        let stream = with_timeout(timeout, TcpStream::connect((host, port))).await?;
        Ok(Stream::Tcp(stream))
    }

    async fn connect_unix(dir: &str, port: u16, timeout: Option<Duration>) -> Result<Stream> {
        let path = format!("{dir}/.s.PGSQL.{port}");
        let stream = with_timeout(timeout, UnixStream::connect(&path)).await?;
        Ok(Stream::Unix(stream))
    }

    /// Run one query to completion. `params` of `None` uses the simple
    /// query path; `Some` (even empty) uses the extended pipeline.
    pub async fn execute(&self, query: &str, params: Option<&[Param]>) -> Result<Response> {
        let mut session = self.session.lock().await;
        let session = &mut *session;

        let out = session.write_buf.borrow();
        session.engine.start_execute(query, params, out)?;
        session.stream.write_all(out).await?;

        let result = match session.drive().await {
            Ok(Event::QueryComplete(result)) => result,
            Ok(_) => Err(Error::Protocol("unexpected event during execute".into())),
            Err(err) => Err(err),
        };

        // `drive` already closes the stream on a propagated error (malformed
        // frame, engine protocol violation, I/O failure). A `ServerError`
        // delivered through `QueryComplete` bypasses that path entirely, so
        // a FATAL/PANIC severity (after which the server closes its end
        // without ever sending another `ReadyForQuery`) is handled here.
        if let Err(err) = &result {
            if err.is_connection_broken() && !session.engine.is_fatal() {
                session.engine.mark_fatal();
                let _ = session.stream.shutdown().await;
            }
        }

        result
    }

    /// Terminate the connection. Best-effort: transport errors are swallowed.
    pub async fn close(self) {
        let mut session = self.session.lock().await;
        let session = &mut *session;
        let out = session.write_buf.borrow();
        session.engine.start_close(out);
        let _ = session.stream.write_all(out).await;
        let _ = session.stream.shutdown().await;
    }

    pub async fn application_name(&self) -> Option<String> {
        self.status_parameter("application_name").await
    }

    pub async fn date_style(&self) -> Option<String> {
        self.status_parameter("DateStyle").await
    }

    pub async fn time_zone(&self) -> Option<String> {
        self.status_parameter("TimeZone").await
    }

    pub async fn server_version(&self) -> Option<String> {
        self.status_parameter("server_version").await
    }

    pub async fn is_superuser(&self) -> bool {
        self.status_parameter("is_superuser").await.as_deref() == Some("on")
    }

    pub async fn transaction_status(&self) -> TransactionStatus {
        self.session.lock().await.engine.transaction_status()
    }

    pub async fn status_parameters(&self) -> std::collections::HashMap<String, String> {
        self.session.lock().await.engine.status_parameters().clone()
    }

    async fn status_parameter(&self, name: &str) -> Option<String> {
        self.session.lock().await.engine.status_parameters().get(name).cloned()
    }
}
