// Connection server: accept, parse one request, stream merged logs and stats

pub mod request;
pub mod response;

use crate::config::AppConfig;
use crate::error::{RuntimeError, is_disconnect};
use crate::logs::LogLineSource;
use crate::mux::merge;
use crate::runtime::ContainerRuntime;
use crate::stats::StatsSampler;
use futures_util::StreamExt;
use response::{STREAM_HEADER, error_response, event_frame};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};

/// Per-session knobs, copied into every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// The first read of at most this many bytes is the whole request.
    pub request_buffer_size: usize,
    pub request_timeout: Duration,
    pub log_tail: usize,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            request_buffer_size: config.server.request_buffer_size,
            request_timeout: Duration::from_millis(config.server.request_timeout_ms),
            log_tail: config.streams.log_tail,
        }
    }
}

pub struct ConnectionServer<R> {
    runtime: Arc<R>,
    settings: SessionSettings,
    concurrent_sessions: bool,
}

impl<R: ContainerRuntime> ConnectionServer<R> {
    pub fn new(runtime: Arc<R>, settings: SessionSettings, concurrent_sessions: bool) -> Self {
        Self {
            runtime,
            settings,
            concurrent_sessions,
        }
    }

    /// Accept connections until `shutdown` resolves. Sessions run one at a time unless
    /// concurrent sessions are enabled, in which case each one is its own task.
    /// In-flight sessions are dropped on shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut shutdown => break,
            };
            let (socket, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    let delay = accept_backoff(&e);
                    tracing::warn!(error = %e, ?delay, "accept failed");
                    if delay.is_zero() {
                        continue;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = &mut shutdown => break,
                    }
                }
            };
            tracing::info!(peer = %peer, "New connection");

            let runtime = self.runtime.clone();
            let settings = self.settings;
            let session = async move {
                if let Err(e) = serve_connection(runtime.as_ref(), socket, &settings).await {
                    tracing::warn!(peer = %peer, error = %e, "Session failed");
                }
                tracing::debug!(peer = %peer, "Session closed");
            };

            if self.concurrent_sessions {
                tokio::spawn(session);
            } else {
                tokio::select! {
                    _ = session => {}
                    _ = &mut shutdown => break,
                }
            }
        }
        tracing::info!("Server stopped, closing listener");
        Ok(())
    }
}

/// Delay before the next accept after `err`. Errors about the one incoming connection
/// retry at once; anything else (e.g. out of file descriptors) waits so the loop cannot spin.
pub fn accept_backoff(err: &std::io::Error) -> Duration {
    match err.kind() {
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::ConnectionReset => Duration::ZERO,
        _ => ACCEPT_ERROR_BACKOFF,
    }
}

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

enum Sent {
    Delivered,
    PeerGone,
}

async fn send<T: AsyncWrite + Unpin>(io: &mut T, bytes: &[u8]) -> anyhow::Result<Sent> {
    match io.write_all(bytes).await {
        Ok(()) => Ok(Sent::Delivered),
        Err(e) if is_disconnect(&e) => {
            tracing::debug!(error = %e, "Client disconnected");
            Ok(Sent::PeerGone)
        }
        Err(e) => Err(e.into()),
    }
}

async fn respond_and_close<T: AsyncWrite + Unpin>(
    io: &mut T,
    status: (u16, &str),
    body: &str,
) -> anyhow::Result<()> {
    if let Sent::Delivered = send(io, error_response(status, body).as_bytes()).await? {
        let _ = io.shutdown().await;
    }
    Ok(())
}

fn lookup_status(err: &RuntimeError) -> (u16, &'static str) {
    match err {
        RuntimeError::NotFound(_) => (404, "Not Found"),
        RuntimeError::Unavailable(_) | RuntimeError::Stream(_) => (503, "Service Unavailable"),
    }
}

/// Serve one connection to completion over any byte transport.
///
/// Peer disconnects end the session with `Ok`. Data errors end the event stream and
/// close the connection; they are logged here, not returned.
pub async fn serve_connection<R, T>(
    runtime: &R,
    mut io: T,
    settings: &SessionSettings,
) -> anyhow::Result<()>
where
    R: ContainerRuntime,
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; settings.request_buffer_size];
    let n = match timeout(settings.request_timeout, io.read(&mut buf)).await {
        Err(_) => {
            tracing::debug!("Request read timed out");
            return Ok(());
        }
        Ok(Ok(0)) => return Ok(()),
        Ok(Ok(n)) => n,
        Ok(Err(e)) if is_disconnect(&e) => return Ok(()),
        Ok(Err(e)) => return Err(e.into()),
    };
    let raw = String::from_utf8_lossy(&buf[..n]);
    tracing::debug!(request = %raw, "Request");

    let stream_request = match request::route(&raw) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request");
            return respond_and_close(&mut io, e.status(), &e.body()).await;
        }
    };
    let container = stream_request.container;

    let handle = match runtime.resolve(&container).await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(container = %container, error = %e, "Container lookup failed");
            return respond_and_close(&mut io, lookup_status(&e), &e.to_string()).await;
        }
    };

    let logs = LogLineSource::new(handle.clone()).stream(settings.log_tail);
    let stats = StatsSampler::new(&handle).stream();
    let mut records = std::pin::pin!(merge(logs, stats));

    if let Sent::PeerGone = send(&mut io, STREAM_HEADER.as_bytes()).await? {
        return Ok(());
    }
    tracing::info!(container = %container, "Streaming started");

    let mut frames = 0u64;
    while let Some(record) = records.next().await {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(container = %container, error = %e, "Stream ended on data error");
                break;
            }
        };
        let frame = event_frame(&record.render()?);
        if let Sent::PeerGone = send(&mut io, frame.as_bytes()).await? {
            tracing::info!(container = %container, frames, "Client went away");
            return Ok(());
        }
        frames += 1;
    }

    let _ = io.shutdown().await;
    tracing::info!(container = %container, frames, "Streaming finished");
    Ok(())
}
