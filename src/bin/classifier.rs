//! Classification service
//!
//! Classifies every frame in a folder on a bounded worker pool and broadcasts
//! each result, followed by a sentinel, to the stats subscribers.
//!
//! Run with:
//!   framecast-classifier --log_folder out
//!   framecast-classifier --log_folder out --subscribers 2 --barrier_timeout_secs 30

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use framecast::channel::config::DEFAULT_PUBLISH_ADDR;
use framecast::pool::{ColorBucketClassifier, ThroughputMonitor};
use framecast::producer::discover_frames;
use framecast::{ChannelConfig, ClassifierPool, Error, PoolConfig, Publisher, Result};

#[derive(Debug, Parser)]
#[command(name = "framecast-classifier", about = "Classify frames and broadcast the results")]
struct Args {
    /// Folder holding the extracted PNG frames
    #[arg(long = "log_folder")]
    log_folder: PathBuf,

    /// Publish address (the join barrier uses port + 1)
    #[arg(long, default_value = DEFAULT_PUBLISH_ADDR)]
    addr: SocketAddr,

    /// Concurrent classifications (defaults to the number of cores)
    #[arg(long)]
    workers: Option<usize>,

    /// Subscribers to wait for before publishing
    #[arg(long, default_value_t = 1)]
    subscribers: usize,

    /// Give up waiting for subscribers after this many seconds
    #[arg(long = "barrier_timeout_secs")]
    barrier_timeout_secs: Option<u64>,

    /// Number of known categories
    #[arg(long = "num_classes", default_value_t = 1000)]
    num_classes: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("[classifier] failed to initialize logging: {}", e);
    }

    if let Err(e) = run(args).await {
        eprintln!("[classifier] {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let frames = discover_frames(&args.log_folder)?;

    let mut channel = ChannelConfig::with_addr(args.addr).expected_subscribers(args.subscribers);
    if let Some(secs) = args.barrier_timeout_secs {
        channel = channel.barrier_timeout(Duration::from_secs(secs));
    }

    let mut pool_config = PoolConfig::default().num_classes(args.num_classes);
    if let Some(workers) = args.workers {
        pool_config = pool_config.workers(workers);
    }
    let report_interval = pool_config.report_interval;

    let num_classes = u32::try_from(args.num_classes)
        .map_err(|_| Error::Config(format!("too many classes: {}", args.num_classes)))?;
    let pool = ClassifierPool::new(frames, ColorBucketClassifier::new(num_classes), pool_config)?;

    let mut publisher = Publisher::bind(channel).await?;
    publisher.wait_for_subscribers().await?;

    let monitor = ThroughputMonitor::start(pool.counter(), report_interval, |sample| {
        println!("[classifier] throughput: {} images/sec", sample.delta);
    });

    let mut completions = pool.run();
    while let Some((_, outcome)) = completions.next().await {
        // Failed items are logged by the pool and not published
        if let Ok(result) = outcome {
            publisher.publish_result(&result);
        }
    }
    let summary = completions.finish().await;

    monitor.stop().await;
    publisher.finish().await;

    println!(
        "[classifier] Elapsed time: {:.2}",
        summary.elapsed.as_secs_f64()
    );
    println!(
        "[classifier] Average {:.2} frames/sec",
        summary.average_rate()
    );

    Ok(())
}

fn init_logging() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=info".parse()?),
        )
        .init();
    Ok(())
}
