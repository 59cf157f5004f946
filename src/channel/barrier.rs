//! Join barrier
//!
//! A publish/subscribe transport drops everything a subscriber misses while
//! its subscription is still being set up. The join barrier closes that gap
//! with a request/reply rendezvous on a second port (publish port + 1):
//!
//! ```text
//!  Subscriber                               Publisher
//!  ──────────                               ─────────
//!  connect(publish_addr)  ───────────────►  accept → attach receiver
//!  recv "ATTACHED"        ◄───────────────  writer task started
//!  connect(barrier_addr)  ───────────────►  accept
//!  send "READY"           ───────────────►
//!  recv "GO"              ◄───────────────  send "GO"
//!                                           ... after N handshakes: publish
//! ```
//!
//! The publisher confirms attachment on the data connection itself, so a
//! subscriber can only reach `READY` once its own receiver exists. Handshakes
//! are served one at a time, in arrival order.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use super::frame::{write_frame, FrameReader};
use crate::error::TransportError;

/// First frame on a data connection, sent once its receiver is attached
pub const ATTACHED: &[u8] = b"ATTACHED";

/// Token a subscriber sends once it is subscribed
pub const READY: &[u8] = b"READY";

/// Token the publisher replies with
pub const GO: &[u8] = b"GO";

/// Publisher side of the join barrier
pub struct JoinBarrier {
    listener: TcpListener,
    expected: usize,
    joined: Arc<AtomicUsize>,
}

impl JoinBarrier {
    /// Bind the barrier endpoint
    pub async fn bind(addr: SocketAddr, expected: usize) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        tracing::debug!(addr = %addr, expected = expected, "Join barrier bound");

        Ok(Self {
            listener,
            expected,
            joined: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the barrier is listening on
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared count of completed handshakes
    pub fn joined(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.joined)
    }

    /// Serve handshakes until `expected` subscribers have been released
    ///
    /// Peers that disconnect or send anything but `READY` are skipped.
    pub async fn wait(self) -> Result<(), TransportError> {
        while self.joined.load(Ordering::Acquire) < self.expected {
            let (socket, peer) = self.listener.accept().await?;

            match self.handshake(socket).await {
                Ok(()) => {
                    let joined = self.joined.fetch_add(1, Ordering::AcqRel) + 1;
                    tracing::info!(
                        peer = %peer,
                        joined = joined,
                        expected = self.expected,
                        "Subscriber passed join barrier"
                    );
                }
                Err(TransportError::UnexpectedBarrierPayload(payload)) => {
                    tracing::warn!(peer = %peer, payload = %payload, "Ignoring bad barrier request");
                }
                Err(TransportError::ConnectionClosed) => {
                    tracing::warn!(peer = %peer, "Barrier peer left before handshake");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn handshake(&self, socket: TcpStream) -> Result<(), TransportError> {
        let (read_half, mut write_half) = socket.into_split();
        let mut reader = FrameReader::new(read_half);

        let request = reader
            .read_frame()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;
        if &request[..] != READY {
            return Err(TransportError::UnexpectedBarrierPayload(
                String::from_utf8_lossy(&request).into_owned(),
            ));
        }

        write_frame(&mut write_half, GO).await
    }
}

/// Subscriber side: announce readiness and block until released
pub async fn announce_ready(barrier_addr: SocketAddr) -> Result<(), TransportError> {
    let socket = TcpStream::connect(barrier_addr)
        .await
        .map_err(|source| TransportError::Connect {
            addr: barrier_addr.to_string(),
            source,
        })?;
    let (read_half, mut write_half) = socket.into_split();

    write_frame(&mut write_half, READY).await?;

    let mut reader = FrameReader::new(read_half);
    let reply = reader
        .read_frame()
        .await?
        .ok_or(TransportError::ConnectionClosed)?;

    if &reply[..] != GO {
        return Err(TransportError::UnexpectedBarrierPayload(
            String::from_utf8_lossy(&reply).into_owned(),
        ));
    }

    tracing::debug!(barrier = %barrier_addr, "Released by join barrier");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn bind_local(expected: usize) -> (JoinBarrier, SocketAddr) {
        let barrier = JoinBarrier::bind("127.0.0.1:0".parse().unwrap(), expected)
            .await
            .unwrap();
        let addr = barrier.local_addr().unwrap();
        (barrier, addr)
    }

    #[tokio::test]
    async fn test_ready_is_answered_with_go() {
        let (barrier, addr) = bind_local(1).await;
        let server = tokio::spawn(barrier.wait());

        announce_ready(addr).await.unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_waits_for_expected_count() {
        let (barrier, addr) = bind_local(2).await;
        let joined = barrier.joined();
        let server = tokio::spawn(barrier.wait());

        announce_ready(addr).await.unwrap();
        assert!(!server.is_finished());

        announce_ready(addr).await.unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(joined.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn test_bad_request_is_skipped() {
        let (barrier, addr) = bind_local(1).await;
        let server = tokio::spawn(barrier.wait());

        let mut rogue = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut rogue, b"HELLO").await.unwrap();
        drop(rogue);

        announce_ready(addr).await.unwrap();
        server.await.unwrap().unwrap();
    }
}
