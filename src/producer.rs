//! Frame extraction
//!
//! Decoding is delegated to an external `ffmpeg` binary. Frames are written as
//! sequentially numbered PNG files, which the classification stage later picks
//! up from the same folder.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Error, Result};

/// Frame extraction options
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Input video
    pub video_file: PathBuf,

    /// Output folder for extracted frames
    pub log_folder: PathBuf,

    /// Frames extracted per second of video
    pub fps: u32,

    /// ffmpeg executable
    pub ffmpeg: PathBuf,
}

impl ProducerConfig {
    pub fn new(video_file: impl Into<PathBuf>, log_folder: impl Into<PathBuf>) -> Self {
        Self {
            video_file: video_file.into(),
            log_folder: log_folder.into(),
            fps: 15,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }

    /// Set the extraction frame rate
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Use a specific ffmpeg executable
    pub fn ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    /// Filter graph handed to ffmpeg
    pub fn filter_graph(&self) -> String {
        format!("fps={}", self.fps)
    }

    /// Output pattern: `<log_folder>/<video stem>%04d.png`
    pub fn output_pattern(&self) -> PathBuf {
        let stem = self
            .video_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());

        self.log_folder.join(format!("{}%04d.png", stem))
    }
}

/// Run ffmpeg and extract frames into the log folder
pub async fn extract_frames(config: &ProducerConfig) -> Result<()> {
    if config.fps == 0 {
        return Err(Error::Config("fps must be positive".into()));
    }

    tokio::fs::create_dir_all(&config.log_folder).await?;

    let output = config.output_pattern();
    tracing::info!(
        video = %config.video_file.display(),
        output = %output.display(),
        filter = %config.filter_graph(),
        "Extracting frames"
    );

    let result = Command::new(&config.ffmpeg)
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(&config.video_file)
        .arg("-vf")
        .arg(config.filter_graph())
        .arg(&output)
        .output()
        .await
        .map_err(|e| Error::Producer(format!("failed to run {}: {}", config.ffmpeg.display(), e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::Producer(format!(
            "{} exited with {}: {}",
            config.ffmpeg.display(),
            result.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// List the PNG frames in `folder`, sorted by file name
pub fn discover_frames(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);

        if is_png && path.is_file() {
            frames.push(path);
        }
    }

    frames.sort();
    tracing::debug!(folder = %folder.display(), frames = frames.len(), "Frames discovered");
    Ok(frames)
}
