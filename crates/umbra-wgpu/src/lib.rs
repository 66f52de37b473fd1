//! # umbra-wgpu
//!
//! GPU backend and host controls for the umbra text block.
//!
//! The pieces, bottom to top:
//!
//! - [`DeviceContext`] - owns the wgpu device with limits-tier fallback and
//!   DPI-aware unit conversion; recreated wholesale on device loss
//! - [`RenderSurface`] - offscreen texture the control renders into, resized
//!   only when logical dimensions convert to new pixel dimensions
//! - [`RenderContext`] - per-frame bundle of device, target and encoder;
//!   detects device loss at submission
//! - [`ShadowPipelines`] / [`ShadowEffect`] - separable Gaussian blur plus
//!   tinted offset composite, the drop-shadow layer under the text
//! - [`TextRenderer`] - a [`SurfaceRenderer`] drawing formatted text with a
//!   shadow from a `umbra_text` coverage mask
//! - [`SurfaceHost`] / [`TextBlock`] - frame scheduling, surface lifecycle,
//!   device-loss recovery and the style observer entry point
//!
//! ## Example
//!
//! ```no_run
//! use umbra::LogicalSize;
//! use umbra_wgpu::TextBlock;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut block = TextBlock::new()?;
//!     block.set_text("Hello");
//!     block.set_shadow_offset(3.0);
//!
//!     let desired = block.measure(LogicalSize::new(500.0, 500.0));
//!     block.arrange(desired);
//!     block.attach();
//!
//!     // Per-frame tick from the host framework:
//!     block.on_frame()?;
//!     Ok(())
//! }
//! ```

mod context;
mod device;
mod error;
mod host;
mod renderer;
mod shadow;
mod surface;

pub use context::RenderContext;
pub use device::{DeviceContext, LimitsTier};
pub use error::{DeviceCreationError, RenderError};
pub use host::{SurfaceHost, SurfaceReplacedCallback, TextBlock};
pub use renderer::TextRenderer;
pub use shadow::{blur_margin_dips, ShadowEffect, ShadowPipelines, BLUR_STD_DEV};
pub use surface::{
    run_with_device_recovery, RenderSurface, SurfaceRenderer, MAX_DEVICE_LOSS_RETRIES,
    SURFACE_FORMAT,
};
