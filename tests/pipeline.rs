//! End-to-end: frames on disk → worker pool → broadcast → aggregator

use std::path::{Path, PathBuf};

use image::RgbImage;
use tokio::sync::mpsc;

use framecast::channel::{BroadcastMessage, ChannelConfig, Publisher, Subscriber};
use framecast::error::Error;
use framecast::pool::{ClassifierPool, PoolConfig};
use framecast::producer::discover_frames;
use framecast::stats::{Aggregator, StatsConfig};

mod common;

use common::bind_publisher;

/// Writes one frame per category; the red channel carries the category
fn write_frames(dir: &Path, categories: &[u8]) -> Vec<PathBuf> {
    for (i, &category) in categories.iter().enumerate() {
        RgbImage::from_pixel(16, 9, image::Rgb([category, 0, 0]))
            .save(dir.join(format!("traffic{:04}.png", i + 1)))
            .unwrap();
    }
    discover_frames(dir).unwrap()
}

fn red_channel(image: &RgbImage) -> Result<u32, String> {
    Ok(u32::from(image.get_pixel(0, 0)[0]))
}

async fn connected_pair() -> (Publisher, Subscriber) {
    let mut publisher = bind_publisher(ChannelConfig::default()).await;
    let config = ChannelConfig::with_addr(publisher.local_addr());
    let join = tokio::spawn(async move { Subscriber::connect_synced(&config).await });

    publisher.wait_for_subscribers().await.unwrap();
    (publisher, join.await.unwrap().unwrap())
}

#[tokio::test]
async fn test_three_frames_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), &[7, 7, 42]);
    assert_eq!(frames.len(), 3);

    let (publisher, mut subscriber) = connected_pair().await;

    let pool = ClassifierPool::new(frames.clone(), red_channel, PoolConfig::default()).unwrap();
    let counter = pool.counter();
    let mut completions = pool.run();
    while let Some((_, outcome)) = completions.next().await {
        publisher.publish_result(&outcome.unwrap());
    }
    let summary = completions.finish().await;
    publisher.finish().await;

    assert_eq!(summary.processed, 3);
    assert_eq!(counter.get(), 3);

    let aggregator = Aggregator::new(StatsConfig::default().final_report(true)).unwrap();
    let histogram = aggregator.histogram().clone();
    let stats = aggregator.run(&mut subscriber, |_| {}).await.unwrap();

    assert_eq!(stats.received, 3);
    let report = stats.final_report.unwrap();
    assert_eq!(report.counts, vec![(7, 2), (42, 1)]);
    assert_eq!(histogram.snapshot().total(), 0);
}

#[tokio::test]
async fn test_stream_is_permutation_then_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    let (publisher, mut subscriber) = connected_pair().await;

    let pool = ClassifierPool::new(frames.clone(), red_channel, PoolConfig::default().workers(4))
        .unwrap();
    let mut completions = pool.run();
    while let Some((_, outcome)) = completions.next().await {
        publisher.publish_result(&outcome.unwrap());
    }
    publisher.finish().await;

    let mut files = Vec::new();
    loop {
        match subscriber.receive().await.unwrap() {
            BroadcastMessage::Data { file, .. } => files.push(PathBuf::from(file)),
            BroadcastMessage::Sentinel => break,
            other => panic!("unexpected message {:?}", other),
        }
    }

    files.sort();
    assert_eq!(files, frames);
}

#[tokio::test]
async fn test_corrupt_frame_is_not_published() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), &[3, 4]);
    std::fs::write(dir.path().join("traffic0003.png"), b"truncated").unwrap();
    let frames = discover_frames(dir.path()).unwrap();

    let (publisher, mut subscriber) = connected_pair().await;

    let pool = ClassifierPool::new(frames, red_channel, PoolConfig::default()).unwrap();
    let counter = pool.counter();
    let mut completions = pool.run();
    while let Some((_, outcome)) = completions.next().await {
        if let Ok(result) = outcome {
            publisher.publish_result(&result);
        }
    }
    let summary = completions.finish().await;
    publisher.finish().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(counter.get(), 2);

    let aggregator = Aggregator::new(StatsConfig::default().final_report(true)).unwrap();
    let stats = aggregator.run(&mut subscriber, |_| {}).await.unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.final_report.unwrap().counts, vec![(3, 1), (4, 1)]);
}

#[tokio::test]
async fn test_out_of_range_category_over_the_wire() {
    let (publisher, mut subscriber) = connected_pair().await;

    publisher.publish(&BroadcastMessage::Data {
        file: "bad.png".into(),
        category: 1000,
    });
    publisher.finish().await;

    let aggregator = Aggregator::new(StatsConfig::default()).unwrap();
    let result = aggregator.run(&mut subscriber, |_| {}).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_non_integer_category_skipped_over_the_wire() {
    let (publisher, mut subscriber) = connected_pair().await;

    publisher.publish(&BroadcastMessage::InvalidCategory {
        file: "x.png".into(),
        raw: r#""seven""#.into(),
    });
    publisher.publish(&BroadcastMessage::Data {
        file: "y.png".into(),
        category: 3,
    });
    publisher.finish().await;

    let config = StatsConfig::default().skip_invalid().final_report(true);
    let aggregator = Aggregator::new(config).unwrap();
    let stats = aggregator.run(&mut subscriber, |_| {}).await.unwrap();

    assert_eq!(stats.received, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.final_report.unwrap().counts, vec![(3, 1)]);
}

#[tokio::test]
async fn test_in_process_source() {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(BroadcastMessage::Data {
        file: "a.png".into(),
        category: 9,
    })
    .await
    .unwrap();
    tx.send(BroadcastMessage::Sentinel).await.unwrap();

    let aggregator = Aggregator::new(StatsConfig::default().final_report(true)).unwrap();
    let stats = aggregator.run(&mut rx, |_| {}).await.unwrap();

    assert_eq!(stats.final_report.unwrap().counts, vec![(9, 1)]);
}
