//! Text style state, shaping caches and measurement.

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use umbra::{Color, DisplayMetrics, FontStyle, FontWeight, LogicalRect, LogicalSize, TextAlign, Wrap};

use crate::cache::Slot;
use crate::raster::{rasterize_mask, MaskBitmap};

/// Line height as a multiple of the font size when the face does not dictate
/// its own spacing.
const DEFAULT_LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Owns the text style state and the caches derived from it.
///
/// Two cached artifacts hang off the style state: the shaped layout (a
/// cosmic-text [`Buffer`], which also embodies the text format) and the
/// rasterized coverage [`MaskBitmap`]. Mutators clear exactly the caches
/// their property can affect:
///
/// - text, font family/size/weight/style, alignment, wrap: layout and mask
/// - layout rectangle and display density: layout and mask
/// - foreground: neither, only the brush generation counter
/// - shadow color and offset: nothing, the shadow is applied at composite
///   time from the same mask
///
/// Mutators do not compare against the current value; setting a property to
/// the value it already has still invalidates. The host's property system is
/// expected to deduplicate if it wants to.
pub struct TextFormatter {
    font_system: FontSystem,
    swash_cache: SwashCache,

    text: String,
    font_family: String,
    font_size: f64,
    font_weight: FontWeight,
    font_style: FontStyle,
    alignment: TextAlign,
    wrap: Wrap,
    foreground: Color,
    shadow_color: Color,
    shadow_offset: f64,

    layout_rect: LogicalRect,

    layout: Slot<Buffer>,
    mask: Slot<MaskBitmap>,
    foreground_generation: u64,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            text: String::new(),
            font_family: String::new(),
            font_size: 10.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            alignment: TextAlign::Leading,
            wrap: Wrap::None,
            foreground: Color::rgb(0.0, 0.0, 0.0),
            shadow_color: Color::rgb(0.0, 0.0, 0.0),
            shadow_offset: 3.0,
            layout_rect: LogicalRect::default(),
            layout: Slot::default(),
            mask: Slot::default(),
            foreground_generation: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn shadow_color(&self) -> Color {
        self.shadow_color
    }

    /// Shadow translation in dips, applied on both axes.
    pub fn shadow_offset(&self) -> f64 {
        self.shadow_offset
    }

    pub fn layout_rect(&self) -> LogicalRect {
        self.layout_rect
    }

    /// Bumped whenever the foreground color changes; backends compare it to
    /// know when to recreate their brush without touching the mask.
    pub fn foreground_generation(&self) -> u64 {
        self.foreground_generation
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.invalidate_layout();
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) {
        self.font_family = family.into();
        self.invalidate_layout();
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
        self.invalidate_layout();
    }

    pub fn set_font_weight(&mut self, weight: FontWeight) {
        self.font_weight = weight;
        self.invalidate_layout();
    }

    pub fn set_font_style(&mut self, style: FontStyle) {
        self.font_style = style;
        self.invalidate_layout();
    }

    pub fn set_alignment(&mut self, alignment: TextAlign) {
        self.alignment = alignment;
        self.invalidate_layout();
    }

    pub fn set_wrap(&mut self, wrap: Wrap) {
        self.wrap = wrap;
        self.invalidate_layout();
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.foreground = color;
        self.foreground_generation += 1;
    }

    pub fn set_shadow_color(&mut self, color: Color) {
        self.shadow_color = color;
    }

    pub fn set_shadow_offset(&mut self, offset: f64) {
        self.shadow_offset = offset;
    }

    /// Adopt the rectangle the host arranged the control into.
    ///
    /// Returns `true` when the rectangle differs from the current one, in
    /// which case the layout and mask have been invalidated.
    pub fn set_layout_rect(&mut self, rect: LogicalRect) -> bool {
        if rect == self.layout_rect {
            return false;
        }
        self.layout_rect = rect;
        self.invalidate_layout();
        true
    }

    /// The display density changed; everything laid out in device pixels is
    /// stale.
    pub fn handle_dpi_changed(&mut self) {
        self.invalidate_layout();
    }

    fn invalidate_layout(&mut self) {
        self.layout.clear();
        self.mask.clear();
    }

    /// Build counters, used to observe which mutations invalidate what.
    pub fn layout_builds(&self) -> u32 {
        self.layout.builds()
    }

    pub fn mask_builds(&self) -> u32 {
        self.mask.builds()
    }

    /// Measure the natural size of the text under the given constraint, in
    /// dips. Unconstrained axes (non-finite values) leave that axis
    /// unbounded.
    pub fn measure(&mut self, metrics: &DisplayMetrics, available: LogicalSize) -> LogicalSize {
        let scale = metrics.scale_factor();
        let buffer_metrics = self.buffer_metrics(scale);

        // Transient buffer so measurement never disturbs the render caches.
        let mut buffer = Buffer::new(&mut self.font_system, buffer_metrics);
        buffer.set_wrap(&mut self.font_system, wrap_mode(self.wrap));
        let width_px = finite_pixels(available.width, scale);
        let height_px = finite_pixels(available.height, scale);
        buffer.set_size(&mut self.font_system, width_px, height_px);
        let attrs = attrs_for(&self.font_family, self.font_weight, self.font_style);
        buffer.set_text(&mut self.font_system, &self.text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut ink_w = 0.0f32;
        let mut ink_h = 0.0f32;
        for run in buffer.layout_runs() {
            ink_w = ink_w.max(run.line_w);
            ink_h += run.line_height;
        }

        // Divide out the scale instead of going through the truncating
        // integer conversion; under-reporting here would clip glyphs.
        LogicalSize::new(
            ((ink_w as f64 / scale).ceil()) as f32,
            ((ink_h as f64 / scale).ceil()) as f32,
        )
    }

    /// The shaped layout for the current style state, building it if needed.
    pub fn layout(&mut self, metrics: &DisplayMetrics) -> &Buffer {
        self.ensure_layout(metrics);
        match self.layout.get() {
            Some(buffer) => buffer,
            None => unreachable!(),
        }
    }

    /// The coverage mask for the current layout rectangle, building the
    /// layout and rasterizing if needed.
    pub fn mask(&mut self, metrics: &DisplayMetrics) -> &MaskBitmap {
        self.ensure_layout(metrics);
        if !self.mask.is_built() {
            let size = metrics.size_to_pixels(self.layout_rect.size);
            let bitmap = match self.layout.get() {
                Some(buffer) => rasterize_mask(
                    buffer,
                    &mut self.font_system,
                    &mut self.swash_cache,
                    size,
                ),
                None => MaskBitmap::new(size),
            };
            log::trace!(
                "rasterized {}x{} coverage mask (build {})",
                bitmap.width(),
                bitmap.height(),
                self.mask.builds() + 1
            );
            self.mask.get_or_insert_with(|| bitmap);
        }
        match self.mask.get() {
            Some(mask) => mask,
            None => unreachable!(),
        }
    }

    fn ensure_layout(&mut self, metrics: &DisplayMetrics) {
        if self.layout.is_built() {
            return;
        }
        let scale = metrics.scale_factor();
        let buffer_metrics = self.buffer_metrics(scale);

        let mut buffer = Buffer::new(&mut self.font_system, buffer_metrics);
        buffer.set_wrap(&mut self.font_system, wrap_mode(self.wrap));
        buffer.set_size(
            &mut self.font_system,
            Some((self.layout_rect.width() as f64 * scale) as f32),
            Some((self.layout_rect.height() as f64 * scale) as f32),
        );
        let attrs = attrs_for(&self.font_family, self.font_weight, self.font_style);
        buffer.set_text(&mut self.font_system, &self.text, &attrs, Shaping::Advanced, None);
        if let Some(align) = align_mode(self.alignment) {
            for line in buffer.lines.iter_mut() {
                line.set_align(Some(align));
            }
        }
        buffer.shape_until_scroll(&mut self.font_system, false);

        log::trace!(
            "shaped layout for {} chars at scale {scale} (build {})",
            self.text.len(),
            self.layout.builds() + 1
        );
        self.layout.get_or_insert_with(|| buffer);
    }

    fn buffer_metrics(&self, scale: f64) -> Metrics {
        let font_size_px = (self.font_size * scale) as f32;
        let line_height_px = (self.font_size * DEFAULT_LINE_HEIGHT_FACTOR * scale) as f32;
        Metrics::new(font_size_px, line_height_px)
    }

    /// Whether any font faces are available for shaping. Headless
    /// environments without system fonts shape to nothing.
    pub fn has_fonts(&self) -> bool {
        self.font_system.db().faces().next().is_some()
    }
}

fn attrs_for(family: &str, weight: FontWeight, style: FontStyle) -> Attrs<'_> {
    let attrs = Attrs::new()
        .weight(Weight(weight.to_weight()))
        .style(match style {
            FontStyle::Normal => cosmic_text::Style::Normal,
            FontStyle::Italic => cosmic_text::Style::Italic,
            FontStyle::Oblique => cosmic_text::Style::Oblique,
        });
    if family.is_empty() {
        attrs.family(Family::SansSerif)
    } else {
        attrs.family(Family::Name(family))
    }
}

fn wrap_mode(wrap: Wrap) -> cosmic_text::Wrap {
    match wrap {
        Wrap::None => cosmic_text::Wrap::None,
        Wrap::Word => cosmic_text::Wrap::Word,
        Wrap::Glyph => cosmic_text::Wrap::Glyph,
        Wrap::WordOrGlyph => cosmic_text::Wrap::WordOrGlyph,
    }
}

/// Leading maps to no explicit alignment so the script direction decides.
fn align_mode(alignment: TextAlign) -> Option<cosmic_text::Align> {
    match alignment {
        TextAlign::Leading => None,
        TextAlign::Trailing => Some(cosmic_text::Align::Right),
        TextAlign::Center => Some(cosmic_text::Align::Center),
        TextAlign::Justified => Some(cosmic_text::Align::Justified),
    }
}

fn finite_pixels(dips: f32, scale: f64) -> Option<f32> {
    if dips.is_finite() {
        Some((dips as f64 * scale) as f32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra::{LogicalPoint, LogicalSize};

    fn formatter_with_rect() -> TextFormatter {
        let mut f = TextFormatter::new();
        f.set_text("hello world");
        f.set_layout_rect(LogicalRect::new(
            LogicalPoint::zero(),
            LogicalSize::new(200.0, 50.0),
        ));
        f
    }

    #[test]
    fn test_defaults() {
        let f = TextFormatter::new();
        assert_eq!(f.font_size(), 10.0);
        assert_eq!(f.shadow_offset(), 3.0);
        assert_eq!(f.shadow_color(), Color::rgb(0.0, 0.0, 0.0));
        assert_eq!(f.foreground(), Color::rgb(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_text_change_invalidates_layout_and_mask() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 1);
        assert_eq!(f.mask_builds(), 1);

        f.set_text("changed");
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 2);
        assert_eq!(f.mask_builds(), 2);
    }

    #[test]
    fn test_same_value_set_still_invalidates() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);

        f.set_font_size(10.0);
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 2);
        assert_eq!(f.mask_builds(), 2);
    }

    #[test]
    fn test_foreground_only_bumps_generation() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);
        let gen_before = f.foreground_generation();

        f.set_foreground(Color::rgb(1.0, 0.0, 0.0));
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 1);
        assert_eq!(f.mask_builds(), 1);
        assert_eq!(f.foreground_generation(), gen_before + 1);
    }

    #[test]
    fn test_shadow_properties_invalidate_nothing() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);

        f.set_shadow_offset(9.0);
        f.set_shadow_color(Color::rgb(0.5, 0.5, 0.5));
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 1);
        assert_eq!(f.mask_builds(), 1);
        assert_eq!(f.foreground_generation(), 0);
    }

    #[test]
    fn test_layout_rect_change_detection() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);

        let same = f.layout_rect();
        assert!(!f.set_layout_rect(same));
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 1);

        assert!(f.set_layout_rect(LogicalRect::new(
            LogicalPoint::zero(),
            LogicalSize::new(300.0, 50.0),
        )));
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 2);
        assert_eq!(f.mask_builds(), 2);
    }

    #[test]
    fn test_dpi_change_invalidates_layout() {
        let mut metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        f.mask(&metrics);

        metrics.set_dpi(192.0);
        f.handle_dpi_changed();
        f.mask(&metrics);
        assert_eq!(f.layout_builds(), 2);
        assert_eq!(f.mask_builds(), 2);
    }

    #[test]
    fn test_mask_matches_layout_rect_in_pixels() {
        let metrics = DisplayMetrics::new(192.0);
        let mut f = formatter_with_rect();
        let mask = f.mask(&metrics);
        assert_eq!(mask.width(), 400);
        assert_eq!(mask.height(), 100);
    }

    #[test]
    fn test_measure_scales_with_font_size() {
        let metrics = DisplayMetrics::default();
        let mut f = TextFormatter::new();
        if !f.has_fonts() {
            // No system fonts; shaping produces nothing to measure.
            return;
        }
        f.set_text("hello world");

        let available = LogicalSize::new(f32::INFINITY, f32::INFINITY);
        let small = f.measure(&metrics, available);
        f.set_font_size(20.0);
        let large = f.measure(&metrics, available);

        assert!(small.width > 0.0);
        assert!(large.width > small.width);
        assert!(large.height > small.height);
    }

    #[test]
    fn test_mask_has_coverage_for_nonempty_text() {
        let metrics = DisplayMetrics::default();
        let mut f = formatter_with_rect();
        if !f.has_fonts() {
            return;
        }
        let mask = f.mask(&metrics);
        assert!(mask.pixels().iter().any(|&p| p > 0));
    }

    #[test]
    fn test_measure_empty_text() {
        let metrics = DisplayMetrics::default();
        let mut f = TextFormatter::new();
        let size = f.measure(&metrics, LogicalSize::new(f32::INFINITY, f32::INFINITY));
        assert_eq!(size.width, 0.0);
    }

    #[test]
    fn test_wrap_constrains_measured_width() {
        let metrics = DisplayMetrics::default();
        let mut f = TextFormatter::new();
        if !f.has_fonts() {
            return;
        }
        f.set_text("several words that will not fit on one narrow line");
        f.set_wrap(umbra::Wrap::Word);

        let unconstrained = f.measure(&metrics, LogicalSize::new(f32::INFINITY, f32::INFINITY));
        let constrained = f.measure(&metrics, LogicalSize::new(80.0, f32::INFINITY));

        assert!(constrained.width <= 81.0);
        assert!(constrained.height > unconstrained.height);
    }
}
