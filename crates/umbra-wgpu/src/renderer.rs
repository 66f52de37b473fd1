//! Text-with-shadow drawing strategy.

use umbra::{Color, PixelSize};
use umbra_text::TextFormatter;

use crate::context::RenderContext;
use crate::device::DeviceContext;
use crate::error::RenderError;
use crate::shadow::{ShadowEffect, ShadowPipelines};
use crate::surface::SurfaceRenderer;

/// Draws formatted text with a drop shadow into the surface.
///
/// Owns the [`TextFormatter`] and the device-bound caches derived from it:
/// the shadow/composite pipelines and the GPU copy of the coverage mask.
/// The CPU-side caches live in the formatter and survive a device loss;
/// the GPU caches are dropped by [`reset`](SurfaceRenderer::reset).
pub struct TextRenderer {
    formatter: TextFormatter,
    pipelines: Option<ShadowPipelines>,
    mask_texture: Option<wgpu::Texture>,
    mask_size: PixelSize,
    /// Formatter mask build the GPU texture currently holds.
    uploaded_mask_build: u32,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self {
            formatter: TextFormatter::new(),
            pipelines: None,
            mask_texture: None,
            mask_size: PixelSize::new(0, 0),
            uploaded_mask_build: 0,
        }
    }

    pub fn formatter(&self) -> &TextFormatter {
        &self.formatter
    }

    pub fn formatter_mut(&mut self) -> &mut TextFormatter {
        &mut self.formatter
    }

    /// Whether a GPU mask is currently resident.
    pub fn has_gpu_mask(&self) -> bool {
        self.mask_texture.is_some()
    }

    fn ensure_mask_texture(&mut self, ctx: &RenderContext<'_>, size: PixelSize) -> bool {
        let needs_new = match &self.mask_texture {
            Some(_) => size != self.mask_size,
            None => true,
        };
        if needs_new {
            self.mask_texture = Some(ctx.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("Umbra Text Mask"),
                size: wgpu::Extent3d {
                    width: size.width as u32,
                    height: size.height as u32,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            }));
            self.mask_size = size;
        }
        needs_new
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceRenderer for TextRenderer {
    fn reset(&mut self, _device: &DeviceContext) {
        self.pipelines = None;
        self.mask_texture = None;
        self.mask_size = PixelSize::new(0, 0);
        self.uploaded_mask_build = 0;
    }

    fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let metrics = *ctx.metrics();
        let device = ctx.device();
        let queue = ctx.queue();
        let target = ctx.target();
        let bounds = ctx.bounds();

        if self.pipelines.is_none() {
            self.pipelines = Some(ShadowPipelines::new(device, ctx.target_format()));
        }
        // Clear the update region without disturbing the rest of the
        // backing texture.
        if let Some(pipelines) = &self.pipelines {
            pipelines.fill(
                device,
                queue,
                ctx.encoder(),
                target,
                bounds,
                Color::transparent(),
            );
        }

        // Geometry may have changed since the last frame; adopting the
        // rectangle invalidates the layout and mask caches if it did.
        self.formatter.set_layout_rect(ctx.logical_rect());

        let mask_px = {
            let mask = self.formatter.mask(&metrics);
            if mask.size().is_empty() {
                // Nothing to draw; the cleared region is the frame.
                return Ok(());
            }
            mask.size()
        };

        let recreated = self.ensure_mask_texture(ctx, mask_px);
        if recreated || self.formatter.mask_builds() != self.uploaded_mask_build {
            let mask = self.formatter.mask(&metrics);
            let texture = match &self.mask_texture {
                Some(texture) => texture,
                None => return Err(RenderError::Unavailable),
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                mask.pixels(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(mask.width()),
                    rows_per_image: Some(mask.height()),
                },
                wgpu::Extent3d {
                    width: mask.width(),
                    height: mask.height(),
                    depth_or_array_layers: 1,
                },
            );
            self.uploaded_mask_build = self.formatter.mask_builds();
        }

        let mask_view = match &self.mask_texture {
            Some(texture) => texture.create_view(&wgpu::TextureViewDescriptor::default()),
            None => return Err(RenderError::Unavailable),
        };
        let offset_px = metrics.dips_to_pixels(self.formatter.shadow_offset());

        if let Some(pipelines) = &self.pipelines {
            // Shadow layer first, sharp text on top.
            let effect = ShadowEffect::new(
                pipelines,
                device,
                queue,
                &mask_view,
                self.mask_size,
                self.formatter.shadow_color(),
                offset_px,
            );
            effect.record(pipelines, ctx.encoder(), target, bounds);

            pipelines.composite(
                device,
                queue,
                ctx.encoder(),
                target,
                bounds,
                &mask_view,
                self.mask_size,
                self.formatter.foreground(),
                0,
            );
        }
        Ok(())
    }
}
