//! In-memory display for headless runs and tests

use std::sync::{Arc, Mutex};

use super::{EyeDisplay, FrameBuffer, check_frame_size};
use crate::Result;

#[derive(Debug)]
struct Shared {
    last: FrameBuffer,
    flushes: u64,
}

/// Display that keeps the last shown frame
#[derive(Debug)]
pub struct MemoryDisplay {
    width: u32,
    height: u32,
    shared: Arc<Mutex<Shared>>,
}

/// Read-only view into a [`MemoryDisplay`] that outlives the move into the renderer
#[derive(Debug, Clone)]
pub struct MemoryDisplayInspector {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryDisplay {
    /// Create a blank in-memory display
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shared: Arc::new(Mutex::new(Shared {
                last: FrameBuffer::new(width, height),
                flushes: 0,
            })),
        }
    }

    /// Create a display together with an inspector for its frames
    #[must_use]
    pub fn with_inspector(width: u32, height: u32) -> (Self, MemoryDisplayInspector) {
        let display = Self::new(width, height);
        let view = display.inspector();
        (display, view)
    }

    /// Get an inspector onto this display
    #[must_use]
    pub fn inspector(&self) -> MemoryDisplayInspector {
        MemoryDisplayInspector {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl EyeDisplay for MemoryDisplay {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn show(&mut self, frame: &FrameBuffer) -> Result<()> {
        check_frame_size(frame, self.size())?;
        if let Ok(mut shared) = self.shared.lock() {
            shared.last.clone_from(frame);
            shared.flushes += 1;
        }
        Ok(())
    }
}

impl MemoryDisplayInspector {
    /// Last frame shown
    #[must_use]
    pub fn last_frame(&self) -> Option<FrameBuffer> {
        self.shared.lock().ok().map(|s| s.last.clone())
    }

    /// Number of frames shown so far
    #[must_use]
    pub fn flushes(&self) -> u64 {
        self.shared.lock().map(|s| s.flushes).unwrap_or_default()
    }
}
