//! Broadcast publisher
//!
//! Accepts subscriber connections on the publish address and fans every
//! published message out to all of them through a `tokio::sync::broadcast`
//! channel. Each subscriber connection gets a writer task that owns its socket
//! and forwards frames in publish order.
//!
//! Messages are framed once at publish time; `bytes::Bytes` is reference
//! counted, so subscribers share the same allocation.
//!
//! A writer greets its subscriber with an `ATTACHED` frame before forwarding
//! anything. The subscriber only moves on to the join barrier after that
//! frame, which ties every `READY` to a connection that is already receiving.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::{JoinHandle, JoinSet};

use super::barrier::{JoinBarrier, ATTACHED};
use super::config::{barrier_addr_for, ChannelConfig};
use super::frame::{encode_frame, write_frame};
use super::message::{BroadcastMessage, ClassificationResult};
use crate::error::{Error, Result, TransportError};

/// Single-writer side of the broadcast channel
pub struct Publisher {
    config: ChannelConfig,
    local_addr: SocketAddr,
    barrier: Option<JoinBarrier>,
    tx: broadcast::Sender<Bytes>,
    attached: Arc<AtomicUsize>,
    writers: Arc<Mutex<JoinSet<()>>>,
    accept_handle: JoinHandle<()>,
}

impl Publisher {
    /// Bind the publish address, then the join barrier address
    ///
    /// The barrier is bound strictly after the publish socket, so a subscriber
    /// that reaches the barrier has already been able to connect for data.
    pub async fn bind(config: ChannelConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.publish_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: config.publish_addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(TransportError::from)?;

        let barrier_addr = barrier_addr_for(local_addr)?;
        let barrier = JoinBarrier::bind(barrier_addr, config.expected_subscribers).await?;

        tracing::info!(
            addr = %local_addr,
            barrier = %barrier_addr,
            expected_subscribers = config.expected_subscribers,
            "Publisher bound"
        );

        let (tx, _) = broadcast::channel(config.capacity.max(1));
        let attached = Arc::new(AtomicUsize::new(0));
        let writers = Arc::new(Mutex::new(JoinSet::new()));

        let accept_handle = tokio::spawn(accept_loop(
            listener,
            tx.clone(),
            Arc::clone(&attached),
            Arc::clone(&writers),
            config.tcp_nodelay,
        ));

        Ok(Self {
            config,
            local_addr,
            barrier: Some(barrier),
            tx,
            attached,
            writers,
            accept_handle,
        })
    }

    /// Address subscribers connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of subscriber connections currently attached
    ///
    /// A connection stops counting once its writer notices it is gone.
    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    /// Block until the configured number of subscribers passed the join barrier
    ///
    /// Without a `barrier_timeout` this waits forever if a subscriber never
    /// shows up. Can only be called once.
    pub async fn wait_for_subscribers(&mut self) -> Result<()> {
        let barrier = self
            .barrier
            .take()
            .ok_or_else(|| Error::Config("join barrier already completed".into()))?;
        let expected = self.config.expected_subscribers;
        let joined = barrier.joined();
        let handshakes = barrier.wait();

        match self.config.barrier_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, handshakes).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TransportError::BarrierTimeout {
                        joined: joined.load(Ordering::Acquire),
                        expected,
                    }
                    .into());
                }
            },
            None => handshakes.await?,
        }

        tracing::info!(subscribers = expected, "All subscribers joined");
        Ok(())
    }

    /// Broadcast a message to every attached subscriber
    ///
    /// Fire-and-forget: returns the number of subscriber queues the message was
    /// placed in (0 when nobody is attached).
    pub fn publish(&self, msg: &BroadcastMessage) -> usize {
        self.tx.send(encode_frame(&msg.encode())).unwrap_or(0)
    }

    /// Broadcast a classification result
    pub fn publish_result(&self, result: &ClassificationResult) -> usize {
        self.publish(&BroadcastMessage::data(result))
    }

    /// Publish the sentinel, then shut the channel down
    pub async fn finish(self) {
        let receivers = self.publish(&BroadcastMessage::Sentinel);
        tracing::info!(receivers = receivers, "Sentinel published");
        self.shutdown().await;
    }

    /// Stop accepting subscribers and wait until every writer flushed its queue
    pub async fn shutdown(self) {
        // The accept loop holds a sender clone; it must be gone for writers to see Closed
        self.accept_handle.abort();
        let _ = self.accept_handle.await;
        drop(self.tx);

        let mut writers = self.writers.lock().await;
        while let Some(result) = writers.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Subscriber writer task failed");
            }
        }

        tracing::info!(addr = %self.local_addr, "Publisher closed");
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: broadcast::Sender<Bytes>,
    attached: Arc<AtomicUsize>,
    writers: Arc<Mutex<JoinSet<()>>>,
    tcp_nodelay: bool,
) {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                if tcp_nodelay {
                    if let Err(e) = socket.set_nodelay(true) {
                        tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                }

                // Counted before the writer can greet the subscriber
                let rx = tx.subscribe();
                let subscribers = attached.fetch_add(1, Ordering::AcqRel) + 1;
                writers.lock().await.spawn(forward_to_subscriber(
                    socket,
                    peer_addr,
                    rx,
                    Arc::clone(&attached),
                ));

                tracing::info!(peer = %peer_addr, subscribers = subscribers, "Subscriber attached");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept subscriber");
            }
        }
    }
}

async fn forward_to_subscriber(
    mut socket: TcpStream,
    peer_addr: SocketAddr,
    rx: broadcast::Receiver<Bytes>,
    attached: Arc<AtomicUsize>,
) {
    forward_frames(&mut socket, peer_addr, rx).await;
    attached.fetch_sub(1, Ordering::AcqRel);

    if let Err(e) = socket.shutdown().await {
        tracing::debug!(peer = %peer_addr, error = %e, "Subscriber shutdown failed");
    }
    tracing::debug!(peer = %peer_addr, "Subscriber writer finished");
}

async fn forward_frames(
    socket: &mut TcpStream,
    peer_addr: SocketAddr,
    mut rx: broadcast::Receiver<Bytes>,
) {
    if let Err(e) = write_frame(socket, ATTACHED).await {
        tracing::debug!(peer = %peer_addr, error = %e, "Subscriber greeting failed");
        return;
    }

    loop {
        match rx.recv().await {
            Ok(frame) => {
                if let Err(e) = socket.write_all(&frame).await {
                    tracing::debug!(peer = %peer_addr, error = %e, "Subscriber write failed");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(peer = %peer_addr, skipped = skipped, "Subscriber lagging, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
