//! # umbra
//!
//! Graphics backend agnostic core for the umbra text block.
//!
//! This crate provides the pieces of the control that do not touch a GPU:
//! color, logical/pixel geometry, display-density conversion, the style
//! attribute vocabulary, and the frame-invalidation state machine. Rendering
//! is handled by separate backend crates like `umbra-wgpu`.
//!
//! ## Core Types
//!
//! - [`DisplayMetrics`] - DPI store and dip ↔ device-pixel conversion
//! - [`FrameScheduler`] - decides *when* a frame must be re-rendered
//! - [`StyleAttribute`] - observer payload bridging host property changes
//! - [`LogicalRect`] / [`PixelRect`] - geometry in dips and device pixels

mod color;
mod frame;
mod geometry;
mod metrics;
mod style;

pub use color::*;
pub use frame::*;
pub use geometry::*;
pub use metrics::*;
pub use style::*;
