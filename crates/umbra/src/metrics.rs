//! Display density and unit conversion.

use crate::{LogicalPoint, LogicalRect, LogicalSize, PixelPoint, PixelRect, PixelSize};

/// Reference density: one dip equals one pixel at 96 DPI.
pub const DIPS_PER_INCH: f64 = 96.0;

/// Logical DPI of the display the control is rendered on.
///
/// Mutated on display-density-change notifications. Conversions truncate
/// toward zero, matching the reference behavior; callers that need to cover
/// fractional remainders should over-allocate on the logical side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    dpi: f64,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            dpi: DIPS_PER_INCH,
        }
    }
}

impl DisplayMetrics {
    /// Create metrics for the given logical DPI.
    ///
    /// # Panics
    /// Panics if `dpi` is not strictly positive; a non-positive density is a
    /// host programming error, not a recoverable condition.
    pub fn new(dpi: f64) -> Self {
        assert!(dpi > 0.0, "logical DPI must be positive, got {dpi}");
        Self { dpi }
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Update the density. Does not itself trigger a re-render; that is the
    /// caller's responsibility.
    ///
    /// # Panics
    /// Panics if `dpi` is not strictly positive.
    pub fn set_dpi(&mut self, dpi: f64) {
        assert!(dpi > 0.0, "logical DPI must be positive, got {dpi}");
        self.dpi = dpi;
    }

    /// `pixels = dips * dpi / 96`, truncated toward zero.
    pub fn dips_to_pixels(&self, dips: f64) -> i32 {
        (dips * self.dpi / DIPS_PER_INCH) as i32
    }

    /// `dips = pixels * 96 / dpi`, truncated toward zero.
    pub fn pixels_to_dips(&self, pixels: i32) -> i32 {
        (pixels as f64 * DIPS_PER_INCH / self.dpi) as i32
    }

    /// Scale factor relative to the 96 DPI reference.
    pub fn scale_factor(&self) -> f64 {
        self.dpi / DIPS_PER_INCH
    }

    pub fn size_to_pixels(&self, size: LogicalSize) -> PixelSize {
        PixelSize::new(
            self.dips_to_pixels(size.width as f64),
            self.dips_to_pixels(size.height as f64),
        )
    }

    pub fn point_to_dips(&self, point: PixelPoint) -> LogicalPoint {
        LogicalPoint::new(
            self.pixels_to_dips(point.x) as f32,
            self.pixels_to_dips(point.y) as f32,
        )
    }

    pub fn rect_to_dips(&self, rect: PixelRect) -> LogicalRect {
        LogicalRect::new(
            self.point_to_dips(rect.origin),
            LogicalSize::new(
                self.pixels_to_dips(rect.size.width) as f32,
                self.pixels_to_dips(rect.size.height) as f32,
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_at_reference_dpi() {
        let m = DisplayMetrics::new(96.0);
        assert_eq!(m.dips_to_pixels(10.0), 10);
        assert_eq!(m.pixels_to_dips(10), 10);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let m = DisplayMetrics::new(144.0);
        // 10 dips * 1.5 = 15 px, 7 dips * 1.5 = 10.5 -> 10
        assert_eq!(m.dips_to_pixels(10.0), 15);
        assert_eq!(m.dips_to_pixels(7.0), 10);
        // 10 px / 1.5 = 6.66 -> 6
        assert_eq!(m.pixels_to_dips(10), 6);
    }

    #[test]
    fn test_round_trip_within_one_dip() {
        for dpi in [96.0, 120.0, 144.0, 192.0, 288.0] {
            let m = DisplayMetrics::new(dpi);
            for dips in 0..600 {
                let back = m.pixels_to_dips(m.dips_to_pixels(dips as f64));
                assert!(
                    (back - dips).abs() <= 1,
                    "round trip of {dips} dips at {dpi} dpi gave {back}"
                );
            }
        }
    }

    #[test]
    fn test_conversion_is_pure() {
        let m = DisplayMetrics::new(120.0);
        assert_eq!(m.dips_to_pixels(33.0), m.dips_to_pixels(33.0));
        assert_eq!(m.dpi(), 120.0);
    }

    #[test]
    #[should_panic]
    fn test_zero_dpi_rejected() {
        DisplayMetrics::new(0.0);
    }

    #[test]
    fn test_rect_to_dips() {
        let m = DisplayMetrics::new(192.0);
        let r = m.rect_to_dips(PixelRect::new(
            PixelPoint::new(20, 40),
            PixelSize::new(200, 100),
        ));
        assert_eq!(r.origin, LogicalPoint::new(10.0, 20.0));
        assert_eq!(r.size, LogicalSize::new(100.0, 50.0));
    }
}
