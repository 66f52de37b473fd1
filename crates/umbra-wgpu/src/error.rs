//! Error types for device creation and frame rendering.

use std::fmt;

/// No usable GPU device could be created.
///
/// Fatal and surfaced at construction; there is no software fallback.
#[derive(Debug)]
pub enum DeviceCreationError {
    /// No adapter was offered by any backend.
    NoAdapter,
    /// An adapter exists but refused every limits tier we support.
    NoSupportedTier,
}

impl fmt::Display for DeviceCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCreationError::NoAdapter => write!(f, "no GPU adapter available"),
            DeviceCreationError::NoSupportedTier => {
                write!(f, "no supported device limits tier on this adapter")
            }
        }
    }
}

impl std::error::Error for DeviceCreationError {}

/// A frame could not be drawn.
#[derive(Debug)]
pub enum RenderError {
    /// Renderer or device not ready; skip this frame, the next tick retries.
    Unavailable,
    /// The GPU device became unusable mid-frame and must be recreated.
    DeviceLost,
    /// Device recreation itself failed while recovering from a loss.
    RecoveryFailed(DeviceCreationError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Unavailable => write!(f, "renderer not ready, frame skipped"),
            RenderError::DeviceLost => write!(f, "GPU device lost"),
            RenderError::RecoveryFailed(err) => {
                write!(f, "device recreation after loss failed: {err}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::RecoveryFailed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            DeviceCreationError::NoAdapter.to_string(),
            "no GPU adapter available"
        );
        assert!(RenderError::RecoveryFailed(DeviceCreationError::NoSupportedTier)
            .to_string()
            .contains("no supported device limits tier"));
    }
}
