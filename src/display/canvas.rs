//! Monochrome frame buffer and drawing primitives
//!
//! Pixels are stored in SSD1306 page order: byte `(y / 8) * width + x`,
//! bit `y % 8`. A flushed buffer can be streamed to the panel as-is.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};

use crate::Result;

/// 1-bit-per-pixel canvas
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("lit", &self.lit_pixels())
            .finish()
    }
}

impl FrameBuffer {
    /// Create a blank buffer
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let pages = height.div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; (width * pages) as usize],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw page-ordered bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Turn every pixel off
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Set every pixel to `on`
    pub fn fill(&mut self, on: bool) {
        self.data.fill(if on { 0xFF } else { 0x00 });
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y / 8) * self.width + x;
        Some((idx as usize, 1 << (y % 8)))
    }

    /// Set one pixel; coordinates outside the buffer are ignored
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if let Some((idx, bit)) = self.index(x, y) {
            if on {
                self.data[idx] |= bit;
            } else {
                self.data[idx] &= !bit;
            }
        }
    }

    /// Read one pixel; out of bounds reads as off
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .is_some_and(|(idx, bit)| self.data[idx] & bit != 0)
    }

    /// Horizontal run of `w` pixels starting at `(x, y)`
    #[allow(clippy::cast_possible_wrap)]
    pub fn hline(&mut self, x: i32, y: i32, w: i32, on: bool) {
        if w <= 0 || y < 0 || y >= self.height as i32 {
            return;
        }
        let start = x.max(0);
        let end = (x + w).min(self.width as i32);
        for px in start..end {
            self.set_pixel(px, y, on);
        }
    }

    /// Filled rectangle; non-positive sizes draw nothing
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        for row in y..y + h {
            self.hline(x, row, w, on);
        }
    }

    /// Filled rectangle with rounded corners of radius `r`
    ///
    /// The radius is clamped to half the shorter side.
    pub fn fill_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        let r = r.clamp(0, (w / 2).min(h / 2));
        for j in 0..h {
            let dy_top = r - j;
            let dy_bottom = j - (h - 1 - r);
            let dy = dy_top.max(dy_bottom).max(0);
            let inset = if dy > 0 {
                r - (r * r - dy * dy).max(0).isqrt()
            } else {
                0
            };
            self.hline(x + inset, y + j, w - 2 * inset, on);
        }
    }

    /// Filled circle centred on `(cx, cy)`
    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, on: bool) {
        if r < 0 {
            return;
        }
        for dy in -r..=r {
            let dx = (r * r - dy * dy).max(0).isqrt();
            self.hline(cx - dx, cy + dy, 2 * dx + 1, on);
        }
    }

    /// Filled triangle (scanline)
    #[allow(clippy::too_many_arguments)]
    pub fn fill_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        on: bool,
    ) {
        let mut pts = [(x0, y0), (x1, y1), (x2, y2)];
        pts.sort_by_key(|p| p.1);
        let [(ax, ay), (bx, by), (cx, cy)] = pts;

        if ay == cy {
            let min = ax.min(bx).min(cx);
            let max = ax.max(bx).max(cx);
            self.hline(min, ay, max - min + 1, on);
            return;
        }

        for y in ay..=cy {
            let xa = interpolate(ax, ay, cx, cy, y);
            let xb = if y < by {
                interpolate(ax, ay, bx, by, y)
            } else {
                interpolate(bx, by, cx, cy, y)
            };
            let (left, right) = if xa < xb { (xa, xb) } else { (xb, xa) };
            self.hline(left, y, right - left + 1, on);
        }
    }

    /// Filled heart centred on `(cx, cy)`, `size` pixels wide
    pub fn fill_heart(&mut self, cx: i32, cy: i32, size: i32, on: bool) {
        let r = size / 4;
        if r < 1 {
            self.fill_rect(cx - 1, cy - 1, 2, 2, on);
            return;
        }
        let lobe_y = cy - (3 * r) / 4;
        self.fill_circle(cx - r, lobe_y, r, on);
        self.fill_circle(cx + r, lobe_y, r, on);
        self.fill_triangle(
            cx - 2 * r,
            lobe_y,
            cx + 2 * r,
            lobe_y,
            cx,
            lobe_y + (5 * r) / 2,
            on,
        );
    }

    /// Number of lit pixels
    #[must_use]
    pub fn lit_pixels(&self) -> u32 {
        self.data.iter().map(|b| b.count_ones()).sum()
    }

    /// Render as text, `#` for lit pixels
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                out.push(if self.pixel(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    /// Convert to a grayscale image (lit = white)
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.pixel(x as i32, y as i32) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

/// Compose left and right eye frames into one image with a gap between
#[must_use]
pub fn compose_pair(left: &FrameBuffer, right: &FrameBuffer, gap: u32) -> GrayImage {
    let width = left.width() + gap + right.width();
    let height = left.height().max(right.height());
    let mut img = GrayImage::new(width, height);

    image::imageops::replace(&mut img, &left.to_image(), 0, 0);
    image::imageops::replace(
        &mut img,
        &right.to_image(),
        i64::from(left.width() + gap),
        0,
    );
    img
}

/// Encode a grayscale image as PNG bytes
///
/// # Errors
///
/// Returns error if PNG encoding fails
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

/// X coordinate on the edge `(x0, y0)-(x1, y1)` at row `y`
const fn interpolate(x0: i32, y0: i32, x1: i32, y1: i32, y: i32) -> i32 {
    if y1 == y0 {
        x0
    } else {
        x0 + (x1 - x0) * (y - y0) / (y1 - y0)
    }
}
