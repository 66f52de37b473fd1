//! Geometry in the two unit spaces the control works with.
//!
//! Logical types are f32 device-independent pixels ("dips"); pixel types are
//! i32 device pixels. Converting between the two goes through
//! [`DisplayMetrics`](crate::DisplayMetrics) so the DPI is applied in exactly
//! one place.

/// A 2D point in logical units (dips)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LogicalPoint {
    pub x: f32,
    pub y: f32,
}

impl LogicalPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A 2D size in logical units (dips)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LogicalSize {
    pub width: f32,
    pub height: f32,
}

impl LogicalSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub const fn zero() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle in logical units, origin + size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LogicalRect {
    pub origin: LogicalPoint,
    pub size: LogicalSize,
}

impl LogicalRect {
    pub const fn new(origin: LogicalPoint, size: LogicalSize) -> Self {
        Self { origin, size }
    }

    pub const fn from_size(size: LogicalSize) -> Self {
        Self {
            origin: LogicalPoint::zero(),
            size,
        }
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

/// A 2D point in device pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }
}

/// A 2D size in device pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelSize {
    pub width: i32,
    pub height: i32,
}

impl PixelSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Axis-aligned rectangle in device pixels, origin + size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub origin: PixelPoint,
    pub size: PixelSize,
}

impl PixelRect {
    pub const fn new(origin: PixelPoint, size: PixelSize) -> Self {
        Self { origin, size }
    }

    pub const fn from_size(size: PixelSize) -> Self {
        Self {
            origin: PixelPoint::zero(),
            size,
        }
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_rect_accessors() {
        let r = LogicalRect::new(LogicalPoint::new(2.0, 3.0), LogicalSize::new(10.0, 20.0));
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.height(), 20.0);
        assert!(!r.is_empty());
        assert!(LogicalRect::default().is_empty());
    }

    #[test]
    fn test_pixel_rect_from_size() {
        let r = PixelRect::from_size(PixelSize::new(640, 480));
        assert_eq!(r.origin, PixelPoint::zero());
        assert_eq!(r.width(), 640);
        assert_eq!(r.height(), 480);
    }
}
