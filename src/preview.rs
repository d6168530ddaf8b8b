//! Offline previews: render a mood to PNG files without panels

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::display::{PngDisplay, compose_pair};
use crate::eyes::{EyesConfig, Mood, RoboEyesDual};
use crate::Result;

/// Gap between the two eyes in the combined image
const PAIR_GAP: u32 = 8;

/// What to render
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub mood: Mood,
    pub frames: u32,
    pub seed: u64,
    /// Panel size in pixels
    pub panel: (u32, u32),
    pub eyes: EyesConfig,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            mood: Mood::Default,
            frames: 60,
            seed: 0,
            panel: (128, 64),
            eyes: EyesConfig::default(),
        }
    }
}

/// Files produced by [`render_preview`]
#[derive(Debug, Clone)]
pub struct PreviewReport {
    pub frames: u32,
    pub dir: PathBuf,
    /// Last frame of both eyes side by side
    pub composite: PathBuf,
}

/// Render `options.frames` frames into `dir` as `left_nnnn.png` /
/// `right_nnnn.png`, plus a side-by-side `preview.png`
///
/// Frames are spaced by the configured frame interval on a synthetic clock,
/// so the output is the same for the same seed.
///
/// # Errors
///
/// Returns error if the directory or any PNG cannot be written
pub fn render_preview(dir: impl AsRef<Path>, options: &PreviewOptions) -> Result<PreviewReport> {
    let dir = dir.as_ref().to_path_buf();
    let (width, height) = options.panel;
    let left = PngDisplay::new(&dir, "left", width, height)?;
    let right = PngDisplay::new(&dir, "right", width, height)?;

    let mut eyes = RoboEyesDual::with_seed(left, right, options.eyes.clone(), options.seed)?;
    eyes.begin()?;

    let start = Instant::now();
    let interval = options.eyes.frame_interval();
    eyes.renderer_mut().set_mood(options.mood, start);

    let mut now = start;
    for _ in 0..options.frames {
        eyes.draw_frame(now)?;
        now += interval;
    }

    let composite = dir.join("preview.png");
    let renderer = eyes.renderer();
    compose_pair(renderer.left_frame(), renderer.right_frame(), PAIR_GAP).save(&composite)?;

    tracing::info!(
        mood = %options.mood,
        frames = options.frames,
        path = %dir.display(),
        "preview written"
    );

    Ok(PreviewReport {
        frames: options.frames,
        dir,
        composite,
    })
}
