//! Broadcast channel with join barrier
//!
//! One publisher fans classification results out to any number of
//! subscribers over TCP. Delivery is in order and at most once: a subscriber
//! only sees what is published after it has been attached.
//!
//! # Architecture
//!
//! ```text
//!                 Publisher                                Subscriber
//!        ┌───────────────────────────┐
//!        │ publish_addr (port P)     │◄──── connect ──────── connect()
//!        │   accept → rx = tx.sub()  │───── ATTACHED ──────►
//!        │   writer task per conn ───┼───── frames ────────► receive()
//!        │                           │
//!        │ barrier_addr (port P + 1) │◄──── READY ────────── announce_ready()
//!        │   count k of N            │───── GO ────────────►
//!        └───────────────────────────┘
//! ```
//!
//! The publisher starts emitting only after `wait_for_subscribers` returns,
//! and ends the stream with a sentinel message.

pub mod barrier;
pub mod config;
pub mod frame;
pub mod message;
pub mod publisher;
pub mod subscriber;

pub use barrier::JoinBarrier;
pub use config::ChannelConfig;
pub use message::{BroadcastMessage, ClassificationResult};
pub use publisher::Publisher;
pub use subscriber::Subscriber;
