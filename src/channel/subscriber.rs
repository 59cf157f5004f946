//! Broadcast subscriber

use std::net::SocketAddr;

use tokio::net::TcpStream;

use super::barrier::{announce_ready, ATTACHED};
use super::config::{barrier_addr_for, ChannelConfig};
use super::frame::FrameReader;
use super::message::BroadcastMessage;
use crate::error::{Result, TransportError};

/// Reading side of the broadcast channel
///
/// Owned by a single task; messages arrive in publish order.
pub struct Subscriber {
    publish_addr: SocketAddr,
    reader: FrameReader<TcpStream>,
}

impl Subscriber {
    /// Attach to a publisher without synchronizing
    ///
    /// Returns once the publisher confirmed the attachment; everything
    /// published from then on is delivered. The publisher does not wait for
    /// this subscriber though: use [`Subscriber::connect_synced`] for that.
    pub async fn connect(publish_addr: SocketAddr) -> std::result::Result<Self, TransportError> {
        let socket = TcpStream::connect(publish_addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: publish_addr.to_string(),
                source,
            })?;

        let mut reader = FrameReader::new(socket);
        let greeting = reader
            .read_frame()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;
        if &greeting[..] != ATTACHED {
            return Err(TransportError::UnexpectedBarrierPayload(
                String::from_utf8_lossy(&greeting).into_owned(),
            ));
        }

        tracing::debug!(publisher = %publish_addr, "Subscriber attached");

        Ok(Self {
            publish_addr,
            reader,
        })
    }

    /// Attach to a publisher and pass its join barrier
    ///
    /// Returns only after the publisher released this subscriber, so every
    /// message published afterwards is delivered.
    pub async fn connect_synced(config: &ChannelConfig) -> Result<Self> {
        let subscriber = Self::connect(config.publish_addr).await?;
        subscriber.announce_ready().await?;
        Ok(subscriber)
    }

    /// Perform the join barrier handshake for this subscriber's publisher
    pub async fn announce_ready(&self) -> Result<()> {
        let barrier_addr = barrier_addr_for(self.publish_addr)?;
        announce_ready(barrier_addr).await?;
        Ok(())
    }

    /// Address of the publisher this subscriber is attached to
    pub fn publish_addr(&self) -> SocketAddr {
        self.publish_addr
    }

    /// Block until the next message arrives
    ///
    /// Fails with [`TransportError::ConnectionClosed`] once the publisher has
    /// gone away.
    pub async fn receive(&mut self) -> std::result::Result<BroadcastMessage, TransportError> {
        let payload = self
            .reader
            .read_frame()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;

        BroadcastMessage::decode(&payload)
    }
}
