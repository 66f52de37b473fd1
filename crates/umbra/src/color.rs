/// RGBA color in linear space with values in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub const fn transparent() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Convert sRGB color (0-255) to linear space
    /// Uses proper sRGB gamma correction (ITU-R BT.709)
    #[inline]
    pub const fn srgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        const fn srgb_to_linear(c: u8) -> f32 {
            let x = c as f32 / 255.0;
            if x <= 0.04045 {
                x / 12.92
            } else {
                // Polynomial approximation of ((x + 0.055) / 1.055)^2.4
                let t = (x + 0.055) / 1.055;
                t * t * (0.5870 * t + 0.4130)
            }
        }

        Self::rgba(
            srgb_to_linear(r),
            srgb_to_linear(g),
            srgb_to_linear(b),
            a as f32 / 255.0,
        )
    }

    /// with alpha builder method taking f32
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    /// Color channels pre-scaled by alpha, as an RGBA array.
    ///
    /// Pipelines that blend with premultiplied-alpha factors expect tint
    /// uniforms in this form.
    pub fn premultiplied(&self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }
}

/// CSS color constants
pub mod css {
    use super::Color;

    pub const BLACK: Color = Color::srgba(0, 0, 0, 255);
    pub const BLUE: Color = Color::srgba(0, 0, 255, 255);
    pub const GRAY: Color = Color::srgba(128, 128, 128, 255);
    pub const GREEN: Color = Color::srgba(0, 128, 0, 255);
    pub const RED: Color = Color::srgba(255, 0, 0, 255);
    pub const SILVER: Color = Color::srgba(192, 192, 192, 255);
    pub const WHITE: Color = Color::srgba(255, 255, 255, 255);
    pub const YELLOW: Color = Color::srgba(255, 255, 0, 255);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premultiplied_scales_channels() {
        let c = Color::rgba(1.0, 0.5, 0.0, 0.5);
        let p = c.premultiplied();
        assert_eq!(p, [0.5, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_srgba_endpoints() {
        assert_eq!(Color::srgba(0, 0, 0, 255), Color::rgb(0.0, 0.0, 0.0));
        let white = Color::srgba(255, 255, 255, 255);
        assert!((white.r - 1.0).abs() < 1e-2);
        assert_eq!(white.a, 1.0);
    }
}
