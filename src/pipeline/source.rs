use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};

use crate::{error::PipelineError, types::Frame};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Seekable media the sampler pulls frames from.
pub trait FrameSource: Send {
    /// Total media length in seconds.
    fn duration(&self) -> f64;

    fn dimensions(&self) -> (u32, u32);

    /// Blocks until the decoder has a stable frame at `seconds`.
    fn seek_to(&mut self, seconds: f64) -> Result<()>;

    /// Image at the last seek position.
    fn current_frame(&mut self) -> Result<Frame>;
}

/// Frames exported from a video as numbered stills, played back at `fps`.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    width: u32,
    height: u32,
    current: Option<Frame>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(anyhow!("frame rate must be positive, got {fps}"));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("failed to list frames in {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        paths.sort();

        let Some(first) = paths.first() else {
            return Err(anyhow!("no image frames found in {}", dir.display()));
        };
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("failed to read frame header {}", first.display()))?;

        log::info!(
            "opened {} frames ({}x{}) from {} at {fps} fps",
            paths.len(),
            width,
            height,
            dir.display()
        );

        Ok(Self {
            paths,
            fps,
            width,
            height,
            current: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn index_at(&self, seconds: f64) -> usize {
        let index = (seconds.max(0.0) * self.fps).floor() as usize;
        index.min(self.paths.len().saturating_sub(1))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn duration(&self) -> f64 {
        self.paths.len() as f64 / self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
        let path = &self.paths[self.index_at(seconds)];
        let image = image::open(path)
            .with_context(|| format!("failed to decode frame {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        self.current = Some(Frame {
            rgba: image.into_raw(),
            width,
            height,
            timestamp: Duration::from_secs_f64(seconds.max(0.0)),
        });
        Ok(())
    }

    fn current_frame(&mut self) -> Result<Frame> {
        self.current
            .take()
            .ok_or_else(|| PipelineError::NoFrameReady.into())
    }
}
