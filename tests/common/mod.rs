//! Helpers shared by the socket tests

use std::io;

use framecast::channel::{ChannelConfig, Publisher};
use framecast::error::{Error, TransportError};

const BIND_ATTEMPTS: usize = 20;

/// Bind a publisher on an ephemeral localhost port
///
/// The barrier takes the port right above the ephemeral one, which something
/// else may hold. Retry with a fresh port until both bind.
pub async fn bind_publisher(config: ChannelConfig) -> Publisher {
    for _ in 0..BIND_ATTEMPTS {
        let config = config.clone().publish_addr("127.0.0.1:0".parse().unwrap());
        match Publisher::bind(config).await {
            Ok(publisher) => return publisher,
            Err(Error::Transport(TransportError::Bind { source, .. }))
                if source.kind() == io::ErrorKind::AddrInUse =>
            {
                continue
            }
            // Ephemeral port 65535 leaves no room for the barrier
            Err(Error::Config(_)) => continue,
            Err(e) => panic!("failed to bind publisher: {}", e),
        }
    }

    panic!("no free publish/barrier port pair after {} attempts", BIND_ATTEMPTS);
}
