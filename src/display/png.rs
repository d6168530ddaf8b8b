//! PNG frame writer for previews without hardware

use std::path::{Path, PathBuf};

use super::{EyeDisplay, FrameBuffer, check_frame_size};
use crate::Result;

/// Writes each shown frame to `<dir>/<prefix>_<nnnn>.png`
pub struct PngDisplay {
    width: u32,
    height: u32,
    dir: PathBuf,
    prefix: String,
    counter: u32,
}

impl PngDisplay {
    /// Create a PNG display, creating `dir` if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl AsRef<Path>, prefix: &str, width: u32, height: u32) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(path = %dir.display(), prefix, "png display initialized");

        Ok(Self {
            width,
            height,
            dir,
            prefix: prefix.to_string(),
            counter: 0,
        })
    }

    /// Path the next frame will be written to
    #[must_use]
    pub fn next_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_{:04}.png", self.prefix, self.counter))
    }

    /// Frames written so far
    #[must_use]
    pub const fn frames_written(&self) -> u32 {
        self.counter
    }
}

impl EyeDisplay for PngDisplay {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn show(&mut self, frame: &FrameBuffer) -> Result<()> {
        check_frame_size(frame, self.size())?;
        let path = self.next_path();
        frame.to_image().save(&path)?;
        self.counter += 1;
        tracing::trace!(path = %path.display(), "frame written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_numbered_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = PngDisplay::new(dir.path(), "left", 16, 8).unwrap();

        display.show(&FrameBuffer::new(16, 8)).unwrap();
        display.show(&FrameBuffer::new(16, 8)).unwrap();

        assert_eq!(display.frames_written(), 2);
        assert!(dir.path().join("left_0000.png").exists());
        assert!(dir.path().join("left_0001.png").exists());
    }
}
