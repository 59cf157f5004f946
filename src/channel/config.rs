//! Broadcast channel configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default publish address
pub const DEFAULT_PUBLISH_ADDR: &str = "127.0.0.1:9901";

const DEFAULT_PUBLISH_PORT: u16 = 9901;

/// Broadcast channel options
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Address the publisher binds and subscribers connect to
    pub publish_addr: SocketAddr,

    /// Number of subscribers the join barrier waits for
    pub expected_subscribers: usize,

    /// Upper bound on the join barrier wait (None = wait forever)
    pub barrier_timeout: Option<Duration>,

    /// Messages buffered per subscriber before it starts losing them
    pub capacity: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            publish_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PUBLISH_PORT)),
            expected_subscribers: 1,
            barrier_timeout: None,
            capacity: 1024,
            tcp_nodelay: true,
        }
    }
}

impl ChannelConfig {
    /// Create a new config with custom publish address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            publish_addr: addr,
            ..Default::default()
        }
    }

    /// Set the publish address
    pub fn publish_addr(mut self, addr: SocketAddr) -> Self {
        self.publish_addr = addr;
        self
    }

    /// Set the number of subscribers to wait for
    pub fn expected_subscribers(mut self, count: usize) -> Self {
        self.expected_subscribers = count;
        self
    }

    /// Bound the join barrier wait
    pub fn barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = Some(timeout);
        self
    }

    /// Set per-subscriber queue capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Join barrier address for this channel's publish address
    pub fn barrier_addr(&self) -> Result<SocketAddr> {
        barrier_addr_for(self.publish_addr)
    }
}

/// Derive the join barrier address: same host, port + 1
pub fn barrier_addr_for(publish_addr: SocketAddr) -> Result<SocketAddr> {
    let port = publish_addr.port().checked_add(1).ok_or_else(|| {
        Error::Config(format!(
            "no barrier port available above {}",
            publish_addr.port()
        ))
    })?;

    let mut addr = publish_addr;
    addr.set_port(port);
    Ok(addr)
}
