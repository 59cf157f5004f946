//! Broadcast channel and join barrier over real localhost sockets

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use framecast::channel::{BroadcastMessage, ChannelConfig, Publisher, Subscriber};
use framecast::error::{Error, TransportError};

mod common;

use common::bind_publisher;

fn data(i: i64) -> BroadcastMessage {
    BroadcastMessage::Data {
        file: format!("frame{:04}.png", i),
        category: i,
    }
}

/// Bind a publisher and complete the barrier with `count` subscribers
async fn publisher_with_subscribers(count: usize) -> (Publisher, Vec<Subscriber>) {
    synced(ChannelConfig::default().expected_subscribers(count)).await
}

/// Bind with `config` and complete the barrier with the expected subscribers
async fn synced(config: ChannelConfig) -> (Publisher, Vec<Subscriber>) {
    let count = config.expected_subscribers;
    let mut publisher = bind_publisher(config).await;
    let subscriber_config = ChannelConfig::with_addr(publisher.local_addr());

    let joins: Vec<_> = (0..count)
        .map(|_| {
            let config = subscriber_config.clone();
            tokio::spawn(async move { Subscriber::connect_synced(&config).await })
        })
        .collect();

    publisher.wait_for_subscribers().await.unwrap();

    let mut subscribers = Vec::with_capacity(count);
    for join in joins {
        subscribers.push(join.await.unwrap().unwrap());
    }
    (publisher, subscribers)
}

#[tokio::test]
async fn test_synced_subscriber_sees_every_message_in_order() {
    let (publisher, mut subscribers) = publisher_with_subscribers(1).await;
    assert_eq!(publisher.attached(), 1);

    for i in 0..500 {
        assert_eq!(publisher.publish(&data(i)), 1);
    }
    publisher.finish().await;

    let subscriber = &mut subscribers[0];
    for i in 0..500 {
        assert_eq!(subscriber.receive().await.unwrap(), data(i));
    }
    assert_eq!(subscriber.receive().await.unwrap(), BroadcastMessage::Sentinel);

    // Publisher is gone: the next receive fails instead of hanging
    assert!(matches!(
        subscriber.receive().await,
        Err(TransportError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_barrier_releases_multiple_subscribers() {
    let (publisher, subscribers) = publisher_with_subscribers(3).await;

    for i in 0..10 {
        assert_eq!(publisher.publish(&data(i)), 3);
    }
    publisher.finish().await;

    for mut subscriber in subscribers {
        let mut received = Vec::new();
        loop {
            let msg = subscriber.receive().await.unwrap();
            if msg.is_sentinel() {
                break;
            }
            received.push(msg);
        }
        assert_eq!(received, (0..10).map(data).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_publish_without_subscribers_is_dropped() {
    let publisher = bind_publisher(ChannelConfig::default()).await;

    assert_eq!(publisher.publish(&data(1)), 0);
    publisher.finish().await;
}

#[tokio::test]
async fn test_late_subscriber_does_not_hang() {
    let (publisher, _subscribers) = publisher_with_subscribers(1).await;
    let addr = publisher.local_addr();
    publisher.finish().await;

    let late = tokio::time::timeout(Duration::from_secs(5), Subscriber::connect(addr))
        .await
        .expect("connect must not hang");
    assert!(matches!(late, Err(TransportError::Connect { .. })));
}

#[tokio::test]
async fn test_barrier_timeout() {
    let mut publisher = bind_publisher(
        ChannelConfig::default()
            .expected_subscribers(2)
            .barrier_timeout(Duration::from_millis(200)),
    )
    .await;

    let config = ChannelConfig::with_addr(publisher.local_addr());
    let only_one = tokio::spawn(async move { Subscriber::connect_synced(&config).await });

    let err = publisher.wait_for_subscribers().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::BarrierTimeout {
            joined: 1,
            expected: 2
        })
    ));

    // The first subscriber was released before the timeout hit
    only_one.await.unwrap().unwrap();
    publisher.shutdown().await;
}

#[tokio::test]
async fn test_barrier_can_only_run_once() {
    let (mut publisher, _subscribers) = publisher_with_subscribers(1).await;

    assert!(matches!(
        publisher.wait_for_subscribers().await,
        Err(Error::Config(_))
    ));
    publisher.shutdown().await;
}

#[tokio::test]
async fn test_lagging_subscriber_skips_ahead_and_sees_sentinel() {
    let (publisher, mut subscribers) = synced(ChannelConfig::default().capacity(2)).await;

    // No await between sends: the writer task cannot drain in between
    for i in 0..100 {
        publisher.publish(&data(i));
    }
    publisher.finish().await;

    let subscriber = &mut subscribers[0];
    let mut received = Vec::new();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match subscriber.receive().await.unwrap() {
                BroadcastMessage::Data { category, .. } => received.push(category),
                BroadcastMessage::Sentinel => break,
                other => panic!("unexpected message {:?}", other),
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "sentinel never arrived");

    assert!(received.len() < 100);
    assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(matches!(
        subscriber.receive().await,
        Err(TransportError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_connect_returns_once_attached() {
    let publisher = bind_publisher(ChannelConfig::default()).await;

    let mut subscriber = Subscriber::connect(publisher.local_addr()).await.unwrap();
    assert_eq!(publisher.attached(), 1);

    assert_eq!(publisher.publish(&data(1)), 1);
    publisher.finish().await;

    assert_eq!(subscriber.receive().await.unwrap(), data(1));
    assert_eq!(subscriber.receive().await.unwrap(), BroadcastMessage::Sentinel);
}

#[tokio::test]
async fn test_departed_connection_stops_counting() {
    let publisher = bind_publisher(ChannelConfig::default()).await;

    let mut stray = TcpStream::connect(publisher.local_addr()).await.unwrap();
    let mut greeting = [0u8; 4];
    stray.read_exact(&mut greeting).await.unwrap();
    assert_eq!(publisher.attached(), 1);
    drop(stray);

    // The writer only notices the peer is gone when a write fails
    let gone = tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.attached() > 0 {
            publisher.publish(&data(0));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(gone.is_ok(), "closed connection still counted");

    publisher.shutdown().await;
}
