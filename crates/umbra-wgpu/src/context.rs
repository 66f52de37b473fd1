//! Per-frame drawing context.

use umbra::{DisplayMetrics, LogicalPoint, LogicalRect, PixelPoint, PixelRect, PixelSize};

use crate::device::DeviceContext;
use crate::error::RenderError;

/// Balances the device error scope pushed at the start of a frame.
///
/// The scope must be popped exactly once whether the frame finishes or is
/// abandoned partway; an unbalanced push would make stale scopes absorb
/// later device errors.
struct ErrorScope {
    guard: Option<wgpu::ErrorScopeGuard>,
}

impl ErrorScope {
    fn push(device: &wgpu::Device) -> Self {
        Self {
            guard: Some(device.push_error_scope(wgpu::ErrorFilter::Internal)),
        }
    }

    /// Pop the scope and report the frame's outcome.
    fn finish(mut self) -> Result<(), RenderError> {
        let guard = self.guard.take().expect("error scope popped twice");
        match pollster::block_on(guard.pop()) {
            None => Ok(()),
            Some(err) => {
                log::warn!("device error during frame submission: {err}");
                Err(RenderError::DeviceLost)
            }
        }
    }
}

impl Drop for ErrorScope {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            // The frame was abandoned before submission; pop the scope so
            // the stack stays balanced across failed frames.
            if let Some(err) = pollster::block_on(guard.pop()) {
                log::debug!("abandoned frame left a device error: {err}");
            }
        }
    }
}

/// Short-lived bundle of everything one draw needs: the device, the target
/// view, a command encoder, and the pixel offset/update rectangle assigned
/// by the surface acquisition step.
///
/// Created fresh for every frame and consumed by [`finish`](Self::finish),
/// which submits the recorded work and reports device loss. Drawing code
/// records passes through [`encoder`](Self::encoder) and never submits on
/// its own. Dropping the context without finishing discards the frame.
pub struct RenderContext<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a wgpu::TextureView,
    target_format: wgpu::TextureFormat,
    encoder: wgpu::CommandEncoder,
    pixel_offset: PixelPoint,
    update_rect: PixelRect,
    metrics: DisplayMetrics,
    scope: ErrorScope,
}

impl<'a> RenderContext<'a> {
    /// Begin a draw against `target`. Installs an error scope that is
    /// resolved by [`finish`](Self::finish) to detect a lost device.
    pub fn begin(
        device_context: &'a DeviceContext,
        target: &'a wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        pixel_offset: PixelPoint,
        update_rect: PixelRect,
    ) -> Self {
        let device = device_context.device();
        let scope = ErrorScope::push(device);
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Umbra Frame Encoder"),
        });
        Self {
            device,
            queue: device_context.queue(),
            target,
            target_format,
            encoder,
            pixel_offset,
            update_rect,
            metrics: *device_context.metrics(),
            scope,
        }
    }

    pub fn device(&self) -> &'a wgpu::Device {
        self.device
    }

    pub fn queue(&self) -> &'a wgpu::Queue {
        self.queue
    }

    pub fn target(&self) -> &'a wgpu::TextureView {
        self.target
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    pub fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    pub fn pixel_offset(&self) -> PixelPoint {
        self.pixel_offset
    }

    pub fn update_rect(&self) -> PixelRect {
        self.update_rect
    }

    pub fn pixel_size(&self) -> PixelSize {
        self.update_rect.size
    }

    /// The update region positioned at the pixel offset. Every pass that
    /// targets the surface view restricts its viewport and scissor to this
    /// rectangle, so the surface may sit at an interior origin inside a
    /// larger backing texture.
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(self.pixel_offset, self.update_rect.size)
    }

    /// The destination rectangle in logical units: the pixel offset and
    /// update size converted to dips.
    pub fn logical_rect(&self) -> LogicalRect {
        let origin: LogicalPoint = self.metrics.point_to_dips(self.pixel_offset);
        LogicalRect::new(
            origin,
            self.metrics
                .rect_to_dips(PixelRect::from_size(self.update_rect.size))
                .size,
        )
    }

    /// Submit the recorded work and pop the error scope.
    ///
    /// An internal error surfaced by the scope means the device is no
    /// longer usable; the caller recreates it and retries the frame.
    pub fn finish(self) -> Result<(), RenderError> {
        let Self {
            queue,
            encoder,
            scope,
            ..
        } = self;
        queue.submit(std::iter::once(encoder.finish()));
        scope.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs a real adapter; environments without one skip.
    fn device() -> Option<DeviceContext> {
        DeviceContext::new().ok()
    }

    fn target(device: &DeviceContext, width: u32, height: u32) -> wgpu::Texture {
        device.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[test]
    fn test_dropped_context_balances_error_scope() {
        let Some(device) = device() else {
            return;
        };
        let texture = target(&device, 16, 16);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let rect = PixelRect::from_size(PixelSize::new(16, 16));

        // Abandon a frame without finishing it.
        for _ in 0..3 {
            let mut ctx =
                RenderContext::begin(&device, &view, texture.format(), PixelPoint::zero(), rect);
            let _ = ctx.encoder();
            drop(ctx);
        }

        // A later frame still resolves its own scope cleanly.
        let ctx = RenderContext::begin(&device, &view, texture.format(), PixelPoint::zero(), rect);
        assert!(ctx.finish().is_ok());
    }

    #[test]
    fn test_bounds_include_pixel_offset() {
        let Some(device) = device() else {
            return;
        };
        let texture = target(&device, 64, 64);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let offset = PixelPoint::new(8, 4);
        let update = PixelRect::from_size(PixelSize::new(32, 16));

        let ctx = RenderContext::begin(&device, &view, texture.format(), offset, update);
        assert_eq!(ctx.bounds(), PixelRect::new(offset, PixelSize::new(32, 16)));
        assert!(ctx.finish().is_ok());
    }
}
