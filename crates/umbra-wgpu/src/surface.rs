//! Offscreen GPU surface and the device-loss recovery policy.

use umbra::{LogicalSize, PixelSize};

use crate::context::RenderContext;
use crate::device::DeviceContext;
use crate::error::{DeviceCreationError, RenderError};

/// Consecutive device losses tolerated within one frame before the frame
/// fails terminally. The reference behavior retries forever; a wedged
/// driver would then spin the UI thread, so the loop is capped here.
pub const MAX_DEVICE_LOSS_RETRIES: u32 = 3;

/// Format the surface and the compositor agree on. Premultiplied alpha so
/// the transparent parts of the text block composite correctly over
/// whatever the host draws behind it.
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// A pluggable drawing strategy the host invokes every frame.
///
/// Implementations draw through the passed [`RenderContext`] and drop any
/// device-derived caches in [`reset`](Self::reset) after a device
/// recreation.
pub trait SurfaceRenderer {
    /// Device was recreated; everything derived from the old one is dead.
    fn reset(&mut self, device: &DeviceContext);

    /// Record this frame's work into the context's encoder.
    ///
    /// Implementations paint the context's whole update region (including
    /// clearing it) and leave the target outside that region untouched.
    fn draw(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError>;
}

/// GPU texture the control renders into, handed to the host compositor.
///
/// Recreated only when the requested logical size converts to different
/// pixel dimensions than the current texture; the old texture is released
/// by the recreation.
pub struct RenderSurface {
    texture: wgpu::Texture,
    size: PixelSize,
    recreations: u32,
}

impl RenderSurface {
    pub fn new(device: &DeviceContext, logical_size: LogicalSize) -> Self {
        let size = clamp_size(device.metrics().size_to_pixels(logical_size));
        let texture = create_target(device.device(), size);
        Self {
            texture,
            size,
            recreations: 0,
        }
    }

    /// Recreate the texture if `logical_size` converts to a pixel size that
    /// differs from the current one. Returns `true` when a new texture was
    /// created, in which case the host must rebind its visual.
    pub fn ensure_size(&mut self, device: &DeviceContext, logical_size: LogicalSize) -> bool {
        let Some(wanted) = size_change(self.size, device.metrics(), logical_size) else {
            return false;
        };
        log::debug!(
            "recreating surface {}x{} -> {}x{}",
            self.size.width,
            self.size.height,
            wanted.width,
            wanted.height
        );
        self.texture = create_target(device.device(), wanted);
        self.size = wanted;
        self.recreations += 1;
        true
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// A view over the backing texture. Row 0 is the top of the rendered
    /// text; any orientation-preserving blit shows it upright.
    pub fn view(&self) -> wgpu::TextureView {
        self.texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// How many times the texture has been replaced since creation.
    pub fn recreations(&self) -> u32 {
        self.recreations
    }
}

/// Textures cannot be zero-sized; an empty control still owns a 1x1 target.
fn clamp_size(size: PixelSize) -> PixelSize {
    PixelSize::new(size.width.max(1), size.height.max(1))
}

/// The pixel size the surface should adopt for `logical_size`, when it
/// differs from `current`. Pure; this is the whole recreate-or-keep
/// decision of [`RenderSurface::ensure_size`].
fn size_change(
    current: PixelSize,
    metrics: &umbra::DisplayMetrics,
    logical_size: LogicalSize,
) -> Option<PixelSize> {
    let wanted = clamp_size(metrics.size_to_pixels(logical_size));
    (wanted != current).then_some(wanted)
}

fn create_target(device: &wgpu::Device, size: PixelSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Umbra Surface"),
        size: wgpu::Extent3d {
            width: size.width as u32,
            height: size.height as u32,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

/// Run `attempt` with the capped device-loss retry policy.
///
/// On [`RenderError::DeviceLost`], `recover` reinitializes the device and
/// the attempt is retried from scratch, up to [`MAX_DEVICE_LOSS_RETRIES`]
/// times. Any other error, or a failed recovery, propagates. Both closures
/// receive `state` so the caller can thread `&mut self` through.
pub fn run_with_device_recovery<S, T>(
    state: &mut S,
    mut attempt: impl FnMut(&mut S) -> Result<T, RenderError>,
    mut recover: impl FnMut(&mut S) -> Result<(), DeviceCreationError>,
) -> Result<T, RenderError> {
    let mut losses = 0;
    loop {
        match attempt(state) {
            Ok(value) => return Ok(value),
            Err(RenderError::DeviceLost) => {
                losses += 1;
                if losses > MAX_DEVICE_LOSS_RETRIES {
                    log::error!("device lost {losses} times in one frame, giving up");
                    return Err(RenderError::DeviceLost);
                }
                log::warn!("device lost, recreating (retry {losses}/{MAX_DEVICE_LOSS_RETRIES})");
                recover(state).map_err(RenderError::RecoveryFailed)?;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra::DisplayMetrics;

    #[test]
    fn test_size_change_same_logical_size_keeps_texture() {
        let metrics = DisplayMetrics::new(96.0);
        let current = PixelSize::new(200, 100);
        let logical = LogicalSize::new(200.0, 100.0);
        assert_eq!(size_change(current, &metrics, logical), None);
    }

    #[test]
    fn test_size_change_detects_dpi_change() {
        let current = PixelSize::new(200, 100);
        let logical = LogicalSize::new(200.0, 100.0);
        let metrics = DisplayMetrics::new(192.0);
        assert_eq!(
            size_change(current, &metrics, logical),
            Some(PixelSize::new(400, 200))
        );
    }

    #[test]
    fn test_size_change_clamps_to_one_pixel() {
        let metrics = DisplayMetrics::new(96.0);
        let current = PixelSize::new(1, 1);
        // A zero logical size still wants a 1x1 target, which matches.
        assert_eq!(size_change(current, &metrics, LogicalSize::zero()), None);
        assert_eq!(
            size_change(PixelSize::new(50, 50), &metrics, LogicalSize::zero()),
            Some(PixelSize::new(1, 1))
        );
    }

    struct Probe {
        attempts: u32,
        recoveries: u32,
        losses_to_inject: u32,
    }

    fn run(losses_to_inject: u32) -> (Result<u32, RenderError>, Probe) {
        let mut probe = Probe {
            attempts: 0,
            recoveries: 0,
            losses_to_inject,
        };
        let result = run_with_device_recovery(
            &mut probe,
            |p| {
                p.attempts += 1;
                if p.losses_to_inject > 0 {
                    p.losses_to_inject -= 1;
                    Err(RenderError::DeviceLost)
                } else {
                    Ok(p.attempts)
                }
            },
            |p| {
                p.recoveries += 1;
                Ok(())
            },
        );
        (result, probe)
    }

    #[test]
    fn test_success_without_loss() {
        let (result, probe) = run(0);
        assert_eq!(result.ok(), Some(1));
        assert_eq!(probe.recoveries, 0);
    }

    #[test]
    fn test_single_loss_recovers_once_then_retries() {
        let (result, probe) = run(1);
        assert_eq!(result.ok(), Some(2));
        assert_eq!(probe.attempts, 2);
        assert_eq!(probe.recoveries, 1);
    }

    #[test]
    fn test_retry_cap() {
        let (result, probe) = run(MAX_DEVICE_LOSS_RETRIES + 1);
        assert!(matches!(result, Err(RenderError::DeviceLost)));
        assert_eq!(probe.recoveries, MAX_DEVICE_LOSS_RETRIES);
    }

    #[test]
    fn test_failed_recovery_propagates() {
        let mut attempts = 0u32;
        let result: Result<(), RenderError> = run_with_device_recovery(
            &mut attempts,
            |n| {
                *n += 1;
                Err(RenderError::DeviceLost)
            },
            |_| Err(DeviceCreationError::NoAdapter),
        );
        assert!(matches!(result, Err(RenderError::RecoveryFailed(_))));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_non_loss_error_is_not_retried() {
        let mut attempts = 0u32;
        let result: Result<(), RenderError> = run_with_device_recovery(
            &mut attempts,
            |n| {
                *n += 1;
                Err(RenderError::Unavailable)
            },
            |_| Ok(()),
        );
        assert!(matches!(result, Err(RenderError::Unavailable)));
        assert_eq!(attempts, 1);
    }
}
