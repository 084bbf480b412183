//! Newline-delimited JSON over TCP.
//!
//! Each line a client sends is one request; each gets exactly one reply line.

use std::io;
use std::sync::Arc;

use arm_ik::IkError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::planner::{error_line, Planner};

pub const DEFAULT_ADDR: &str = "127.0.0.1:16100";
pub const ADDR_ENV: &str = "ARM_IK_ADDR";

/// Listen address: the argument, else `ARM_IK_ADDR`, else the default
pub fn resolve_addr(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var(ADDR_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

/// Accept connections forever, one task per client.
pub async fn serve(listener: TcpListener, planner: Arc<Planner>) -> io::Result<()> {
    info!("listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!("client connected from {}", peer);

        let planner = Arc::clone(&planner);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, planner).await {
                error!("Failed to handle client {}: {}", peer, e);
            }
        });
    }
}

/// Longest request line accepted, newline excluded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Answer every request line on `stream` until it closes.
pub async fn handle_connection<S>(stream: S, planner: Arc<Planner>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    handle_connection_with_limit(stream, planner, MAX_LINE_BYTES).await
}

/// Like [`handle_connection`] with an explicit line length limit.
///
/// A line longer than `max_line` bytes gets one error reply and ends the
/// connection. A final line without a newline is answered once the client
/// closes its side.
pub async fn handle_connection_with_limit<S>(mut stream: S, planner: Arc<Planner>, max_line: usize) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0; 4096];
    let mut pending = Vec::new();

    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            let request = String::from_utf8_lossy(&pending).trim().to_string();
            if !request.is_empty() {
                reply(&mut stream, &planner, request).await?;
            }
            break;
        }
        pending.extend_from_slice(&buffer[..n]);

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            if pos > max_line {
                return reject_line(&mut stream, max_line).await;
            }
            let line: Vec<u8> = pending.drain(..=pos).collect();
            let request = String::from_utf8_lossy(&line).trim().to_string();
            if request.is_empty() {
                continue;
            }
            reply(&mut stream, &planner, request).await?;
        }

        if pending.len() > max_line {
            return reject_line(&mut stream, max_line).await;
        }
    }

    Ok(())
}

async fn reply<S>(stream: &mut S, planner: &Arc<Planner>, request: String) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let line = answer(planner, request).await;
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await
}

async fn reject_line<S>(stream: &mut S, max_line: usize) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    warn!("request line exceeds {} bytes, closing connection", max_line);
    let err = IkError::InvalidJson(format!("request line exceeds {} bytes", max_line));
    stream.write_all(error_line(&err).as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.shutdown().await
}

/// Plan one request on the blocking pool
async fn answer(planner: &Arc<Planner>, request: String) -> String {
    let planner = Arc::clone(planner);
    match tokio::task::spawn_blocking(move || planner.respond(&request)).await {
        Ok((line, _)) => line,
        Err(e) => error_line(&IkError::SolveFailed(e.to_string())),
    }
}
