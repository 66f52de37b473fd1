//! CPU-side coverage bitmaps produced from shaped text.

use cosmic_text::{Buffer, FontSystem, SwashCache};
use umbra::PixelSize;

/// Single-channel coverage bitmap, one byte per pixel, row-major.
///
/// The value is glyph coverage (0 = empty, 255 = fully covered). Backends
/// upload it as an alpha texture and apply color at composite time, so the
/// bitmap itself never needs rebuilding when only colors change.
#[derive(Debug, Clone)]
pub struct MaskBitmap {
    size: PixelSize,
    pixels: Vec<u8>,
}

impl MaskBitmap {
    pub fn new(size: PixelSize) -> Self {
        let len = (size.width.max(0) as usize) * (size.height.max(0) as usize);
        Self {
            size,
            pixels: vec![0; len],
        }
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width.max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.size.height.max(0) as u32
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Accumulate coverage at a pixel, saturating where glyphs overlap.
    pub fn blend(&mut self, x: i32, y: i32, coverage: u8) {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return;
        }
        let idx = y as usize * self.size.width as usize + x as usize;
        self.pixels[idx] = self.pixels[idx].max(coverage);
    }
}

/// Rasterize a shaped buffer into a coverage mask of the given pixel size.
///
/// Color glyphs (emoji) contribute their alpha channel only; the sharp
/// composite pass reapplies the foreground color uniformly.
pub fn rasterize_mask(
    buffer: &Buffer,
    font_system: &mut FontSystem,
    swash_cache: &mut SwashCache,
    size: PixelSize,
) -> MaskBitmap {
    let mut mask = MaskBitmap::new(size);
    let white = cosmic_text::Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    buffer.draw(font_system, swash_cache, white, |x, y, w, h, color| {
        let coverage = color.a();
        if coverage == 0 {
            return;
        }
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                mask.blend(x + dx, y + dy, coverage);
            }
        }
    });
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_clips_out_of_bounds() {
        let mut mask = MaskBitmap::new(PixelSize::new(4, 2));
        mask.blend(-1, 0, 200);
        mask.blend(4, 0, 200);
        mask.blend(0, 2, 200);
        assert!(mask.pixels().iter().all(|&p| p == 0));

        mask.blend(3, 1, 200);
        assert_eq!(mask.pixels()[7], 200);
    }

    #[test]
    fn test_blend_saturates_on_overlap() {
        let mut mask = MaskBitmap::new(PixelSize::new(1, 1));
        mask.blend(0, 0, 120);
        mask.blend(0, 0, 80);
        assert_eq!(mask.pixels()[0], 120);
    }
}
