//! # umbra-text
//!
//! Text shaping, measurement and mask rasterization for the umbra text
//! block, built on cosmic-text.
//!
//! The [`TextFormatter`] owns the style state (text, font, alignment, wrap,
//! colors, shadow) and two derived caches: the shaped layout and a
//! single-channel coverage [`MaskBitmap`]. Backend crates upload the mask to
//! the GPU and handle coloring and the drop shadow there, which is why color
//! changes never force a re-shape or re-rasterize here.

mod cache;
mod formatter;
mod raster;

pub use cache::Slot;
pub use formatter::TextFormatter;
pub use raster::{rasterize_mask, MaskBitmap};
