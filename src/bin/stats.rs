//! Stats service
//!
//! Subscribes to the classification broadcast and prints per-class counts for
//! every 10 second window until the end-of-stream sentinel arrives.
//!
//! Run with:
//!   framecast-stats
//!   framecast-stats --addr 127.0.0.1:9901 --skip_invalid --final_report

use std::net::SocketAddr;

use clap::Parser;

use framecast::channel::config::DEFAULT_PUBLISH_ADDR;
use framecast::{Aggregator, ChannelConfig, Result, StatsConfig, Subscriber};

#[derive(Debug, Parser)]
#[command(name = "framecast-stats", about = "Aggregate broadcast classification results")]
struct Args {
    /// Publisher address
    #[arg(long, default_value = DEFAULT_PUBLISH_ADDR)]
    addr: SocketAddr,

    /// Number of known categories
    #[arg(long = "num_classes", default_value_t = 1000)]
    num_classes: usize,

    /// Log and skip out-of-range categories instead of exiting
    #[arg(long = "skip_invalid")]
    skip_invalid: bool,

    /// Print the partial window left when the stream ends
    #[arg(long = "final_report")]
    final_report: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("[stats] failed to initialize logging: {}", e);
    }

    if let Err(e) = run(args).await {
        eprintln!("[stats] {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = StatsConfig::default()
        .num_classes(args.num_classes)
        .final_report(args.final_report);
    if args.skip_invalid {
        config = config.skip_invalid();
    }

    let aggregator = Aggregator::new(config)?;
    let mut subscriber = Subscriber::connect_synced(&ChannelConfig::with_addr(args.addr)).await?;

    let summary = aggregator
        .run(&mut subscriber, |report| println!("[stats] {}", report))
        .await?;

    if let Some(report) = summary.final_report {
        println!("[stats] {}", report);
    }
    println!(
        "[stats] done: {} results, {} rejected",
        summary.received, summary.rejected
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
