//! WebSocket driver.
//!
//! One text (or binary) frame carries one protocol line. Frames that still
//! contain a line feed go through the normal framer so clients that send
//! CRLF-terminated text keep working; the end of the frame also ends its last
//! line, so nothing carries over into the next frame. Outbound lines are sent
//! as text frames with the CRLF removed.

use super::{LineSink, TransportError, finish, write_loop};
use crate::network::buffer::{BufferPool, RecvBuffer};
use crate::network::connection::{Connection, ConnectionEvents};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use http::StatusCode;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tracing::{debug, warn};

/// Whether an upgrade request's `Origin` passes the allow-list.
///
/// An empty list or a `*` entry admits everyone; otherwise the header must be
/// present and match an entry exactly.
pub fn origin_allowed(allow: &[String], origin: Option<&str>) -> bool {
    if allow.is_empty() || allow.iter().any(|a| a == "*") {
        return true;
    }
    origin.is_some_and(|o| allow.iter().any(|a| a == o))
}

fn forbidden() -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some("origin not allowed".to_owned()));
    *resp.status_mut() = StatusCode::FORBIDDEN;
    resp
}

/// Perform the upgrade, then run the connection until it closes.
pub async fn serve<E: ConnectionEvents>(
    stream: TcpStream,
    allow_origins: Arc<[String]>,
    conn: Arc<Connection>,
    rx: mpsc::Receiver<Vec<u8>>,
    events: Arc<E>,
    recv_pool: Arc<BufferPool>,
    send_pool: Arc<BufferPool>,
) -> Result<(), TransportError> {
    let addr = conn.peer_addr();
    let check_origin = |req: &Request, resp: Response| {
        let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
        if origin_allowed(&allow_origins, origin) {
            Ok(resp)
        } else {
            warn!(%addr, origin = origin.unwrap_or("-"), "WebSocket origin rejected");
            Err(forbidden())
        }
    };
    let ws = accept_hdr_async(stream, check_origin).await?;
    debug!(conn = %conn.id(), "WebSocket upgrade complete");

    let (sink, mut source) = ws.split();
    let peer = events.on_connected(&conn);
    let writer = tokio::spawn(write_loop(
        FrameSink { inner: sink },
        rx,
        Arc::clone(&conn),
        send_pool,
    ));

    let mut recv = recv_pool.recv_buffer();
    let result = read_loop(&mut source, &conn, &mut recv, &*events, &peer).await;
    finish(&*events, peer, &conn, recv, writer, result).await;
    Ok(())
}

async fn read_loop<E: ConnectionEvents>(
    source: &mut SplitStream<WebSocketStream<TcpStream>>,
    conn: &Connection,
    recv: &mut RecvBuffer,
    events: &E,
    peer: &E::Peer,
) -> Result<(), TransportError> {
    loop {
        let frame = tokio::select! {
            biased;
            _ = conn.closed().cancelled() => return Ok(()),
            frame = source.next() => frame,
        };
        let payload = match frame {
            None | Some(Ok(WsMessage::Close(_))) => return Ok(()),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(WsMessage::Text(text))) => text.into_bytes(),
            Some(Ok(WsMessage::Binary(bytes))) => bytes,
            Some(Ok(_)) => continue,
        };
        deliver_frame(&payload, recv, |line| events.on_line(peer, line))?;
    }
}

/// Route one frame's payload to the line callback.
fn deliver_frame<F: FnMut(&[u8])>(
    payload: &[u8],
    recv: &mut RecvBuffer,
    mut on_line: F,
) -> Result<(), TransportError> {
    if payload.contains(&b'\n') {
        recv.extend(payload, &mut on_line)?;
        recv.flush_partial(on_line);
    } else if payload.len() > recv.capacity() {
        return Err(TransportError::Overflow);
    } else {
        let line = payload.strip_suffix(b"\r").unwrap_or(payload);
        if !line.is_empty() {
            on_line(line);
        }
    }
    Ok(())
}

struct FrameSink {
    inner: SplitSink<WebSocketStream<TcpStream>, WsMessage>,
}

#[async_trait]
impl LineSink for FrameSink {
    async fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let line = line.strip_suffix(b"\r\n").unwrap_or(line);
        let text = String::from_utf8_lossy(line).into_owned();
        self.inner.feed(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush().await?;
        Ok(())
    }

    async fn shutdown(&mut self) {
        let _ = self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slirc_wire::limits::RECV_BUFFER_LEN;

    fn collect(frames: &[&[u8]]) -> Result<Vec<Vec<u8>>, TransportError> {
        let pool = BufferPool::for_receive(1);
        let mut recv = pool.recv_buffer();
        let mut out = Vec::new();
        for frame in frames {
            deliver_frame(frame, &mut recv, |l| out.push(l.to_vec()))?;
        }
        Ok(out)
    }

    #[test]
    fn test_frame_without_terminator_is_one_line() {
        let lines = collect(&[b"PRIVMSG bob :hi there"]).unwrap();
        assert_eq!(lines, vec![b"PRIVMSG bob :hi there".to_vec()]);
    }

    #[test]
    fn test_frame_with_terminators_uses_framer() {
        let lines = collect(&[b"NICK a\r\nUSER u 0 * :R\r\n"]).unwrap();
        assert_eq!(lines, vec![b"NICK a".to_vec(), b"USER u 0 * :R".to_vec()]);
    }

    #[test]
    fn test_frame_end_terminates_partial_line() {
        let lines = collect(&[b"NICK a\r\nUSER u 0 * :R", b"PING x", b"PONG y\r\n"]).unwrap();
        assert_eq!(
            lines,
            vec![
                b"NICK a".to_vec(),
                b"USER u 0 * :R".to_vec(),
                b"PING x".to_vec(),
                b"PONG y".to_vec(),
            ]
        );
    }

    #[test]
    fn test_oversized_frame_overflows() {
        let big = vec![b'x'; RECV_BUFFER_LEN + 1];
        assert!(matches!(collect(&[&big]), Err(TransportError::Overflow)));
    }

    #[test]
    fn test_empty_frame_ignored() {
        assert!(collect(&[b""]).unwrap().is_empty());
    }

    #[test]
    fn test_origin_policy() {
        let allow = vec!["https://chat.example".to_owned()];
        assert!(origin_allowed(&[], None));
        assert!(origin_allowed(&["*".to_owned()], Some("https://evil")));
        assert!(origin_allowed(&allow, Some("https://chat.example")));
        assert!(!origin_allowed(&allow, Some("https://evil")));
        assert!(!origin_allowed(&allow, None));
    }
}
