//! Plaintext TCP driver.
//!
//! Waits for readiness, then drains the socket with `try_read` for as long
//! as data is already there, up to one receive buffer's worth of bytes per
//! pass. After a full pass the task yields so one busy client cannot hog a
//! worker thread.

use super::{StreamSink, TransportError, finish, write_loop};
use crate::network::buffer::{BufferPool, RecvBuffer};
use crate::network::connection::{Connection, ConnectionEvents};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;

/// Run a plaintext connection until it closes.
pub async fn serve<E: ConnectionEvents>(
    stream: TcpStream,
    conn: Arc<Connection>,
    rx: mpsc::Receiver<Vec<u8>>,
    events: Arc<E>,
    recv_pool: Arc<BufferPool>,
    send_pool: Arc<BufferPool>,
) {
    let (read, write) = stream.into_split();
    let peer = events.on_connected(&conn);
    let writer = tokio::spawn(write_loop(
        StreamSink::new(write),
        rx,
        Arc::clone(&conn),
        send_pool,
    ));

    let mut recv = recv_pool.recv_buffer();
    let result = read_loop(&read, &conn, &mut recv, &*events, &peer).await;
    finish(&*events, peer, &conn, recv, writer, result).await;
}

async fn read_loop<E: ConnectionEvents>(
    read: &OwnedReadHalf,
    conn: &Connection,
    recv: &mut RecvBuffer,
    events: &E,
    peer: &E::Peer,
) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            biased;
            _ = conn.closed().cancelled() => return Ok(()),
            ready = read.readable() => ready?,
        }

        let mut budget = recv.capacity();
        while budget > 0 {
            match read.try_read(recv.spare()) {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    budget = budget.saturating_sub(n);
                    recv.commit(n);
                    recv.drain_lines(|line| events.on_line(peer, line))?;
                    if !conn.is_alive() {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        if budget == 0 {
            tokio::task::yield_now().await;
        }
    }
}
