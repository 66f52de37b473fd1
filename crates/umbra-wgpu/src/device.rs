//! GPU device ownership, limits-tier fallback and DPI-aware conversion.

use umbra::DisplayMetrics;

use crate::error::DeviceCreationError;

/// Device limits tiers, attempted in descending order of capability.
///
/// The first tier the adapter accepts wins. All of them are plenty for a
/// handful of small textures and two tiny pipelines, so falling down the
/// list only matters on very constrained drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitsTier {
    Full,
    Downlevel,
    Webgl2,
}

impl LimitsTier {
    pub const DESCENDING: [LimitsTier; 3] =
        [LimitsTier::Full, LimitsTier::Downlevel, LimitsTier::Webgl2];

    fn limits(self) -> wgpu::Limits {
        match self {
            LimitsTier::Full => wgpu::Limits::default(),
            LimitsTier::Downlevel => wgpu::Limits::downlevel_defaults(),
            LimitsTier::Webgl2 => wgpu::Limits::downlevel_webgl2_defaults(),
        }
    }
}

/// Owns the GPU device and queue for one host control.
///
/// Created once at control construction and recreated wholesale via
/// [`initialize`](Self::initialize) when the device is lost. Holders of
/// device-derived resources must drop them after a recreation; the
/// [`generation`](Self::generation) counter lets them detect one.
pub struct DeviceContext {
    instance: wgpu::Instance,
    device: wgpu::Device,
    queue: wgpu::Queue,
    tier: LimitsTier,
    metrics: DisplayMetrics,
    generation: u64,
}

impl DeviceContext {
    /// Create the device at the default display density (96 DPI).
    pub fn new() -> Result<Self, DeviceCreationError> {
        Self::with_metrics(DisplayMetrics::default())
    }

    pub fn with_metrics(metrics: DisplayMetrics) -> Result<Self, DeviceCreationError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let (device, queue, tier) = pollster::block_on(create_device(&instance))?;
        log::info!("created GPU device at limits tier {tier:?}");
        Ok(Self {
            instance,
            device,
            queue,
            tier,
            metrics,
            generation: 0,
        })
    }

    /// Recreate the device and queue from scratch, dropping the old ones
    /// first. Safe to call repeatedly; each call bumps the generation.
    pub fn initialize(&mut self) -> Result<(), DeviceCreationError> {
        // Release the old device before asking the driver for a new one.
        self.device.destroy();
        let (device, queue, tier) = pollster::block_on(create_device(&self.instance))?;
        self.device = device;
        self.queue = queue;
        self.tier = tier;
        self.generation += 1;
        log::info!(
            "reinitialized GPU device (generation {}, tier {tier:?})",
            self.generation
        );
        Ok(())
    }

    /// The instance, for embedders that need a window surface on the same
    /// backend as the control's textures.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn tier(&self) -> LimitsTier {
        self.tier
    }

    /// Incremented on every [`initialize`](Self::initialize).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    /// Update the display density. Does not trigger a re-render; the caller
    /// requests one after this.
    pub fn set_dpi(&mut self, dpi: f64) {
        self.metrics.set_dpi(dpi);
    }

    pub fn dips_to_pixels(&self, dips: f64) -> i32 {
        self.metrics.dips_to_pixels(dips)
    }

    pub fn pixels_to_dips(&self, pixels: i32) -> i32 {
        self.metrics.pixels_to_dips(pixels)
    }
}

async fn create_device(
    instance: &wgpu::Instance,
) -> Result<(wgpu::Device, wgpu::Queue, LimitsTier), DeviceCreationError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| DeviceCreationError::NoAdapter)?;

    for tier in LimitsTier::DESCENDING {
        match adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Umbra Device"),
                required_features: wgpu::Features::empty(),
                required_limits: tier.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
        {
            Ok((device, queue)) => return Ok((device, queue, tier)),
            Err(err) => {
                log::warn!("limits tier {tier:?} rejected: {err}");
            }
        }
    }
    Err(DeviceCreationError::NoSupportedTier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_descending() {
        let [full, down, webgl2] = LimitsTier::DESCENDING;
        assert_eq!(full, LimitsTier::Full);
        let full = full.limits();
        let down = down.limits();
        let webgl2 = webgl2.limits();
        assert!(full.max_texture_dimension_2d >= down.max_texture_dimension_2d);
        assert!(down.max_texture_dimension_2d >= webgl2.max_texture_dimension_2d);
    }
}
