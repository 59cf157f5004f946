//! Frame producer
//!
//! Extracts frames from a video into a folder for the classifier to pick up.
//!
//! Run with:
//!   framecast-producer --video_file data/traffic.mp4 --log_folder out

use std::path::PathBuf;

use clap::Parser;

use framecast::producer::{extract_frames, ProducerConfig};

#[derive(Debug, Parser)]
#[command(name = "framecast-producer", about = "Extract video frames as PNG files")]
struct Args {
    /// Video to decode
    #[arg(long = "video_file")]
    video_file: PathBuf,

    /// Folder receiving the extracted frames
    #[arg(long = "log_folder")]
    log_folder: PathBuf,

    /// Frames extracted per second of video
    #[arg(long, default_value_t = 15)]
    fps: u32,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("[producer] failed to initialize logging: {}", e);
    }

    let config = ProducerConfig::new(args.video_file, args.log_folder).fps(args.fps);
    if let Err(e) = extract_frames(&config).await {
        eprintln!("[producer] {}", e);
        std::process::exit(1);
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=info".parse()?),
        )
        .init();
    Ok(())
}
