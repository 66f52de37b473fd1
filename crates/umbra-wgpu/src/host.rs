//! Host-side control glue: frame scheduling, surface lifecycle and the
//! style-attribute observer entry point.

use umbra::{
    Color, FrameScheduler, LogicalSize, PixelPoint, PixelRect, StyleAttribute,
};

use crate::context::RenderContext;
use crate::device::DeviceContext;
use crate::error::{DeviceCreationError, RenderError};
use crate::renderer::TextRenderer;
use crate::shadow::blur_margin_dips;
use crate::surface::{
    run_with_device_recovery, RenderSurface, SurfaceRenderer, SURFACE_FORMAT,
};

/// Called when the surface texture was replaced so the host compositor can
/// rebind its visual to the new texture.
pub type SurfaceReplacedCallback = Box<dyn FnMut(&RenderSurface)>;

/// Generic surface-hosting control: owns the device, an offscreen surface
/// and a pluggable renderer, and turns per-frame ticks into draws.
///
/// The host framework drives it with [`arrange`](Self::arrange) and
/// [`on_frame`](Self::on_frame); everything between a tick and the pixels
/// (surface sizing, the draw protocol, device-loss recovery) happens
/// inside.
pub struct SurfaceHost<R: SurfaceRenderer> {
    device: DeviceContext,
    renderer: R,
    surface: Option<RenderSurface>,
    scheduler: FrameScheduler,
    arranged: LogicalSize,
    attached: bool,
    on_surface_replaced: Option<SurfaceReplacedCallback>,
}

impl<R: SurfaceRenderer> SurfaceHost<R> {
    pub fn new(renderer: R) -> Result<Self, DeviceCreationError> {
        Ok(Self::with_device(DeviceContext::new()?, renderer))
    }

    pub fn with_device(device: DeviceContext, renderer: R) -> Self {
        Self {
            device,
            renderer,
            surface: None,
            scheduler: FrameScheduler::new(),
            arranged: LogicalSize::zero(),
            attached: false,
            on_surface_replaced: None,
        }
    }

    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceContext {
        &mut self.device
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    pub fn set_surface_replaced_callback(&mut self, callback: SurfaceReplacedCallback) {
        self.on_surface_replaced = Some(callback);
    }

    /// Subscribe to the frame tick (control entered the live tree).
    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Unsubscribe from the frame tick (control left the live tree).
    /// Pending render requests survive and run after the next attach.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Adopt the logical size the host framework arranged the control to.
    pub fn arrange(&mut self, size: LogicalSize) {
        if size != self.arranged {
            self.arranged = size;
            self.scheduler.request_render();
        }
    }

    pub fn arranged_size(&self) -> LogicalSize {
        self.arranged
    }

    pub fn request_render(&mut self) {
        self.scheduler.request_render();
    }

    pub fn request_render_and_measure(&mut self) {
        self.scheduler.request_render_and_measure();
    }

    /// Whether the host must re-run layout before drawing. Clears the flag.
    pub fn take_measure_request(&mut self) -> bool {
        self.scheduler.take_measure_request()
    }

    /// Per-frame tick. Returns `true` when a frame was drawn and presented
    /// to the surface; `false` when nothing was pending, the control is
    /// detached, a draw is already in flight, or the frame was skipped as
    /// not-yet-ready (it will be retried on the next tick).
    pub fn on_frame(&mut self) -> Result<bool, RenderError> {
        if !self.attached {
            return Ok(false);
        }
        if !self.scheduler.begin_frame() {
            return Ok(false);
        }
        let result = run_with_device_recovery(
            self,
            |host| host.draw_frame(),
            |host| host.recover(),
        );
        self.scheduler.finish_frame();
        match result {
            Ok(()) => Ok(true),
            Err(RenderError::Unavailable) => {
                // Skip this frame; keep the request armed for the next tick.
                self.scheduler.request_render();
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// One attempt of the full draw protocol.
    fn draw_frame(&mut self) -> Result<(), RenderError> {
        if self.arranged.is_empty() {
            return Err(RenderError::Unavailable);
        }

        let mut replaced = false;
        if self.surface.is_none() {
            self.surface = Some(RenderSurface::new(&self.device, self.arranged));
            replaced = true;
        }
        let surface = match &mut self.surface {
            Some(surface) => surface,
            None => return Err(RenderError::Unavailable),
        };
        replaced |= surface.ensure_size(&self.device, self.arranged);
        if replaced {
            if let Some(callback) = self.on_surface_replaced.as_mut() {
                callback(surface);
            }
        }

        let view = surface.view();
        let update_rect = PixelRect::from_size(surface.size());
        let mut ctx = RenderContext::begin(
            &self.device,
            &view,
            SURFACE_FORMAT,
            PixelPoint::zero(),
            update_rect,
        );
        self.renderer.draw(&mut ctx)?;
        ctx.finish()
    }

    /// The device-loss recovery step: new device, renderer drops its
    /// device-bound caches, surface is recreated on the next attempt.
    fn recover(&mut self) -> Result<(), DeviceCreationError> {
        self.device.initialize()?;
        self.renderer.reset(&self.device);
        self.surface = None;
        Ok(())
    }
}

/// Text block control: a [`SurfaceHost`] bound to a [`TextRenderer`], with
/// style-attribute observation and blur-aware measurement on top.
pub struct TextBlock {
    host: SurfaceHost<TextRenderer>,
}

impl TextBlock {
    pub fn new() -> Result<Self, DeviceCreationError> {
        Ok(Self {
            host: SurfaceHost::new(TextRenderer::new())?,
        })
    }

    pub fn host(&self) -> &SurfaceHost<TextRenderer> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut SurfaceHost<TextRenderer> {
        &mut self.host
    }

    pub fn attach(&mut self) {
        self.host.attach();
    }

    pub fn detach(&mut self) {
        self.host.detach();
    }

    pub fn arrange(&mut self, size: LogicalSize) {
        self.host.arrange(size);
    }

    pub fn on_frame(&mut self) -> Result<bool, RenderError> {
        self.host.on_frame()
    }

    /// Observer entry point for the host framework's property system.
    ///
    /// Applies the new value and schedules a frame; attributes that can
    /// change the measured size also schedule a layout pass.
    pub fn on_style_attribute_changed(&mut self, attribute: StyleAttribute) {
        let remeasure = attribute.affects_measure();
        let formatter = self.host.renderer_mut().formatter_mut();
        match attribute {
            StyleAttribute::Text(text) => formatter.set_text(text),
            StyleAttribute::FontFamily(family) => formatter.set_font_family(family),
            StyleAttribute::FontSize(size) => formatter.set_font_size(size),
            StyleAttribute::FontWeight(weight) => formatter.set_font_weight(weight),
            StyleAttribute::FontStyle(style) => formatter.set_font_style(style),
            StyleAttribute::Alignment(alignment) => formatter.set_alignment(alignment),
            StyleAttribute::Wrap(wrap) => formatter.set_wrap(wrap),
            StyleAttribute::Foreground(color) => formatter.set_foreground(color),
            StyleAttribute::ShadowColor(color) => formatter.set_shadow_color(color),
            StyleAttribute::ShadowOffset(offset) => formatter.set_shadow_offset(offset),
        }
        if remeasure {
            self.host.request_render_and_measure();
        } else {
            self.host.request_render();
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.on_style_attribute_changed(StyleAttribute::Text(text.into()));
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.on_style_attribute_changed(StyleAttribute::FontSize(size));
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.on_style_attribute_changed(StyleAttribute::Foreground(color));
    }

    pub fn set_shadow_color(&mut self, color: Color) {
        self.on_style_attribute_changed(StyleAttribute::ShadowColor(color));
    }

    pub fn set_shadow_offset(&mut self, offset: f64) {
        self.on_style_attribute_changed(StyleAttribute::ShadowOffset(offset));
    }

    /// Display density changed. Re-lays-out and schedules a frame.
    pub fn dpi_changed(&mut self, dpi: f64) {
        self.host.device_mut().set_dpi(dpi);
        self.host.renderer_mut().formatter_mut().handle_dpi_changed();
        self.host.request_render_and_measure();
    }

    /// Desired size for the given available box, in dips.
    ///
    /// The constraint is shrunk by the blur margin plus the shadow offset
    /// so the shadow never spills outside the arranged rectangle.
    pub fn measure(&mut self, available: LogicalSize) -> LogicalSize {
        let metrics = *self.host.device().metrics();
        let extent = blur_margin_dips(&metrics)
            + self.host.renderer().formatter().shadow_offset();
        let constrained = LogicalSize::new(
            (available.width - extent as f32).max(0.0),
            (available.height - extent as f32).max(0.0),
        );
        self.host
            .renderer_mut()
            .formatter_mut()
            .measure(&metrics, constrained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra::FontWeight;

    // Host-level tests need a real adapter; environments without one skip.
    fn text_block() -> Option<TextBlock> {
        TextBlock::new().ok()
    }

    #[test]
    fn test_attribute_dispatch_schedules_measure_only_when_needed() {
        let Some(mut block) = text_block() else {
            return;
        };

        block.set_foreground(Color::rgb(1.0, 0.0, 0.0));
        assert!(!block.host_mut().take_measure_request());

        block.set_text("hello");
        assert!(block.host_mut().take_measure_request());

        block.on_style_attribute_changed(StyleAttribute::FontWeight(FontWeight::Bold));
        assert!(block.host_mut().take_measure_request());
    }

    #[test]
    fn test_detached_tick_does_not_draw() {
        let Some(mut block) = text_block() else {
            return;
        };
        block.arrange(LogicalSize::new(100.0, 40.0));
        assert_eq!(block.on_frame().ok(), Some(false));
    }

    #[test]
    fn test_frame_renders_then_goes_idle() {
        let Some(mut block) = text_block() else {
            return;
        };
        block.set_text("Hello");
        block.arrange(LogicalSize::new(200.0, 60.0));
        block.attach();

        let first = block.on_frame();
        assert_eq!(first.ok(), Some(true));
        assert!(block.host().surface().is_some());

        // Nothing changed; the next tick is a no-op.
        assert_eq!(block.on_frame().ok(), Some(false));
    }

    #[test]
    fn test_zero_arrange_skips_but_stays_pending() {
        let Some(mut block) = text_block() else {
            return;
        };
        block.attach();
        assert_eq!(block.on_frame().ok(), Some(false));

        // Once arranged, the retained request draws.
        block.arrange(LogicalSize::new(50.0, 20.0));
        assert_eq!(block.on_frame().ok(), Some(true));
    }

    #[test]
    fn test_surface_replaced_fires_on_resize() {
        let Some(mut block) = text_block() else {
            return;
        };
        use std::cell::Cell;
        use std::rc::Rc;

        let replaced = Rc::new(Cell::new(0u32));
        let seen = replaced.clone();
        block
            .host_mut()
            .set_surface_replaced_callback(Box::new(move |_| seen.set(seen.get() + 1)));

        block.set_text("Hello");
        block.attach();
        block.arrange(LogicalSize::new(100.0, 40.0));
        block.on_frame().ok();
        assert_eq!(replaced.get(), 1);

        // Same logical size, same pixels: no replacement.
        block.host_mut().request_render();
        block.on_frame().ok();
        assert_eq!(replaced.get(), 1);

        block.arrange(LogicalSize::new(300.0, 40.0));
        block.on_frame().ok();
        assert_eq!(replaced.get(), 2);
    }

    #[test]
    fn test_measure_within_constraint() {
        let Some(mut block) = text_block() else {
            return;
        };
        if !block.host().renderer().formatter().has_fonts() {
            return;
        }
        block.set_text("Hello");

        let size = block.measure(LogicalSize::new(500.0, 500.0));
        assert!(size.width > 0.0);
        assert!(size.width.is_finite());
        assert!(size.width <= 500.0);
        assert!(size.height <= 500.0);
    }
}
