//! Eye displays
//!
//! Each eye is drawn on its own 128x64 monochrome panel. The renderer only
//! ever talks to [`EyeDisplay`]; the SSD1306 driver, an in-memory display
//! and a PNG writer implement it.

mod canvas;
#[cfg(target_os = "linux")]
mod i2c;
mod memory;
mod png;
mod ssd1306;
#[cfg(test)]
pub(crate) mod test_bus;

pub use canvas::{FrameBuffer, compose_pair, encode_png};
#[cfg(target_os = "linux")]
pub use i2c::open_i2c_display;
pub use memory::{MemoryDisplay, MemoryDisplayInspector};
pub use png::PngDisplay;
pub use ssd1306::{Ssd1306, Ssd1306Config};

use crate::Result;

/// A panel that can show one eye frame
pub trait EyeDisplay: Send {
    /// Panel size in pixels (width, height)
    fn size(&self) -> (u32, u32);

    /// Push a full frame to the panel
    ///
    /// # Errors
    ///
    /// Returns error if the frame does not match the panel or the bus fails
    fn show(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Blank the panel
    ///
    /// # Errors
    ///
    /// Returns error if the bus fails
    fn clear(&mut self) -> Result<()> {
        let (width, height) = self.size();
        self.show(&FrameBuffer::new(width, height))
    }
}

impl<D: EyeDisplay + ?Sized> EyeDisplay for Box<D> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn show(&mut self, frame: &FrameBuffer) -> Result<()> {
        (**self).show(frame)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

/// Reject frames that don't match the panel size
///
/// # Errors
///
/// Returns `Error::Display` on mismatch
pub fn check_frame_size(frame: &FrameBuffer, size: (u32, u32)) -> Result<()> {
    if (frame.width(), frame.height()) == size {
        Ok(())
    } else {
        Err(crate::Error::Display(format!(
            "frame is {}x{}, panel is {}x{}",
            frame.width(),
            frame.height(),
            size.0,
            size.1
        )))
    }
}
