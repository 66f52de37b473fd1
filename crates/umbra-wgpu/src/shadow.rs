//! Drop-shadow effect graph: blurred, offset, tinted copy of a coverage
//! mask, drawn beneath the sharp text the caller composites afterward.

use umbra::{Color, DisplayMetrics, PixelRect, PixelSize};

/// Standard deviation of the Gaussian blur, in pixels. Also baked into
/// `blur.wgsl`; keep the two in sync.
pub const BLUR_STD_DEV: f32 = 3.0;

/// Logical margin the blur can bleed beyond the text's ink extents.
///
/// The kernel reaches three deviations to each side; the layout constraint
/// is shrunk by this much so the shadow stays inside the arranged box.
pub fn blur_margin_dips(metrics: &DisplayMetrics) -> f64 {
    let full_px = metrics.dips_to_pixels(BLUR_STD_DEV as f64 * 6.0);
    metrics.pixels_to_dips(full_px / 2) as f64
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    direction: [f32; 2],
    texel: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeParams {
    tint: [f32; 4],
    uv_offset: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FillParams {
    color: [f32; 4],
}

/// Device-bound pipelines for the blur and composite passes.
///
/// Cached by the renderer for the life of the device; everything else the
/// effect needs (intermediate textures, uniforms, bind groups) is created
/// per draw and released when the [`ShadowEffect`] drops.
pub struct ShadowPipelines {
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    fill_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    fill_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl ShadowPipelines {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Umbra Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blur.wgsl").into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Umbra Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });
        let fill_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Umbra Fill Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fill.wgsl").into()),
        });

        // Both shaders bind texture + sampler + one small uniform.
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Umbra Shadow Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        // The fill shader binds only its uniform.
        let fill_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Umbra Fill Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Umbra Shadow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let fill_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Umbra Fill Pipeline Layout"),
            bind_group_layouts: &[&fill_layout],
            immediate_size: 0,
        });

        let blur_pipeline = create_fullscreen_pipeline(
            device,
            "Umbra Blur Pipeline",
            &pipeline_layout,
            &blur_shader,
            wgpu::TextureFormat::R8Unorm,
            None,
        );
        let composite_pipeline = create_fullscreen_pipeline(
            device,
            "Umbra Composite Pipeline",
            &pipeline_layout,
            &composite_shader,
            target_format,
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        );
        let fill_pipeline = create_fullscreen_pipeline(
            device,
            "Umbra Fill Pipeline",
            &fill_pipeline_layout,
            &fill_shader,
            target_format,
            None,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Umbra Mask Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            blur_pipeline,
            composite_pipeline,
            fill_pipeline,
            bind_group_layout,
            fill_layout,
            sampler,
        }
    }

    /// Fill `bounds` on `target` with a solid color, leaving the rest of
    /// the texture untouched. This is the clear step of the draw protocol.
    pub fn fill(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bounds: PixelRect,
        color: Color,
    ) {
        let uniform = create_uniform(
            device,
            queue,
            "Umbra Fill Params",
            &FillParams {
                color: color.premultiplied(),
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Umbra Fill Bind Group"),
            layout: &self.fill_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        run_fullscreen_pass(
            encoder,
            "Umbra Fill Pass",
            &self.fill_pipeline,
            &bind_group,
            target,
            wgpu::LoadOp::Load,
            Some(bounds),
        );
    }

    fn mask_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        })
    }

    /// Composite `mask_view` onto `bounds` of `target` with the given
    /// premultiplied tint, shifted by `offset_px`. This is the sharp-text
    /// path; the shadow path goes through [`ShadowEffect`].
    pub fn composite(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bounds: PixelRect,
        mask_view: &wgpu::TextureView,
        mask_size: PixelSize,
        tint: Color,
        offset_px: i32,
    ) {
        let uniform = create_uniform(
            device,
            queue,
            "Umbra Composite Params",
            &CompositeParams {
                tint: tint.premultiplied(),
                uv_offset: uv_offset(offset_px, mask_size),
                _pad: [0.0; 2],
            },
        );
        let bind_group = self.mask_bind_group(device, "Umbra Composite Bind Group", mask_view, &uniform);
        run_fullscreen_pass(
            encoder,
            "Umbra Composite Pass",
            &self.composite_pipeline,
            &bind_group,
            target,
            wgpu::LoadOp::Load,
            Some(bounds),
        );
    }
}

/// One frame's shadow layer: two blur passes over the text mask, then a
/// tinted, offset composite of the result onto the target.
///
/// Built fresh every draw. The intermediate textures are small and the
/// rebuild keeps the resource lifetime trivially correct; they all drop
/// when this value does.
pub struct ShadowEffect {
    ping: wgpu::TextureView,
    pong: wgpu::TextureView,
    blur_h_group: wgpu::BindGroup,
    blur_v_group: wgpu::BindGroup,
    shadow_group: wgpu::BindGroup,
    // Keep the uniforms alive until the submission that reads them.
    _uniforms: [wgpu::Buffer; 3],
}

impl ShadowEffect {
    pub fn new(
        pipelines: &ShadowPipelines,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mask_view: &wgpu::TextureView,
        mask_size: PixelSize,
        shadow_color: Color,
        offset_px: i32,
    ) -> Self {
        let ping = create_blur_target(device, "Umbra Blur Ping", mask_size);
        let pong = create_blur_target(device, "Umbra Blur Pong", mask_size);
        let ping_view = ping.create_view(&wgpu::TextureViewDescriptor::default());
        let pong_view = pong.create_view(&wgpu::TextureViewDescriptor::default());

        let texel = [
            1.0 / mask_size.width.max(1) as f32,
            1.0 / mask_size.height.max(1) as f32,
        ];
        let blur_h = create_uniform(
            device,
            queue,
            "Umbra Blur H Params",
            &BlurParams {
                direction: [1.0, 0.0],
                texel,
            },
        );
        let blur_v = create_uniform(
            device,
            queue,
            "Umbra Blur V Params",
            &BlurParams {
                direction: [0.0, 1.0],
                texel,
            },
        );
        let shadow = create_uniform(
            device,
            queue,
            "Umbra Shadow Params",
            &CompositeParams {
                tint: shadow_color.premultiplied(),
                uv_offset: uv_offset(offset_px, mask_size),
                _pad: [0.0; 2],
            },
        );

        let blur_h_group =
            pipelines.mask_bind_group(device, "Umbra Blur H Bind Group", mask_view, &blur_h);
        let blur_v_group =
            pipelines.mask_bind_group(device, "Umbra Blur V Bind Group", &ping_view, &blur_v);
        let shadow_group =
            pipelines.mask_bind_group(device, "Umbra Shadow Bind Group", &pong_view, &shadow);

        Self {
            ping: ping_view,
            pong: pong_view,
            blur_h_group,
            blur_v_group,
            shadow_group,
            _uniforms: [blur_h, blur_v, shadow],
        }
    }

    /// Record the blur and shadow-composite passes. The blur passes own
    /// their whole intermediates; only the composite onto `target` is
    /// restricted to `bounds`.
    pub fn record(
        &self,
        pipelines: &ShadowPipelines,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bounds: PixelRect,
    ) {
        run_fullscreen_pass(
            encoder,
            "Umbra Blur H Pass",
            &pipelines.blur_pipeline,
            &self.blur_h_group,
            &self.ping,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            None,
        );
        run_fullscreen_pass(
            encoder,
            "Umbra Blur V Pass",
            &pipelines.blur_pipeline,
            &self.blur_v_group,
            &self.pong,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            None,
        );
        run_fullscreen_pass(
            encoder,
            "Umbra Shadow Pass",
            &pipelines.composite_pipeline,
            &self.shadow_group,
            target,
            wgpu::LoadOp::Load,
            Some(bounds),
        );
    }
}

fn uv_offset(offset_px: i32, size: PixelSize) -> [f32; 2] {
    [
        offset_px as f32 / size.width.max(1) as f32,
        offset_px as f32 / size.height.max(1) as f32,
    ]
}

fn create_uniform<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    value: &T,
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    queue.write_buffer(&buffer, 0, bytemuck::bytes_of(value));
    buffer
}

fn create_blur_target(device: &wgpu::Device, label: &str, size: PixelSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1) as u32,
            height: size.height.max(1) as u32,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn run_fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    bounds: Option<PixelRect>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    if let Some(bounds) = bounds {
        // Remap the triangle to the update region and clip to it so the
        // surface may sit anywhere inside a larger backing texture.
        pass.set_viewport(
            bounds.origin.x as f32,
            bounds.origin.y as f32,
            bounds.size.width as f32,
            bounds.size.height as f32,
            0.0,
            1.0,
        );
        pass.set_scissor_rect(
            bounds.origin.x.max(0) as u32,
            bounds.origin.y.max(0) as u32,
            bounds.size.width.max(0) as u32,
            bounds.size.height.max(0) as u32,
        );
    }
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_margin_at_reference_dpi() {
        // 3.0 std dev * 6 = 18 dips full increment, halved to 9.
        let m = DisplayMetrics::new(96.0);
        assert_eq!(blur_margin_dips(&m), 9.0);
    }

    #[test]
    fn test_uv_offset_normalizes_by_size() {
        assert_eq!(uv_offset(3, PixelSize::new(300, 100)), [0.01, 0.03]);
        // Degenerate mask sizes must not divide by zero.
        let [x, y] = uv_offset(3, PixelSize::new(0, 0));
        assert!(x.is_finite() && y.is_finite());
    }
}
