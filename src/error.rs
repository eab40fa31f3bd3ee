//! Crate-wide error type
//!
//! Resource-build failures (no adapter, device loss, shader validation) are
//! fatal and carry the underlying message. Precondition violations (bad
//! sizes, missing wind field, malformed ramps) are rejected before any GPU
//! work is recorded.

use thiserror::Error;

/// Errors that can occur while building GPU resources or driving frames
#[derive(Error, Debug)]
pub enum Error {
    /// No GPU adapter matched the request
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// The adapter refused to provide a device
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// A shader module failed validation
    #[error("shader '{label}' failed validation: {message}")]
    ShaderBuild { label: String, message: String },

    /// A frame was requested before a wind field was bound
    #[error("no wind field bound; call set_wind before draw")]
    NoWindField,

    /// A surface dimension was zero
    #[error("invalid surface size {width}x{height}; both dimensions must be non-zero")]
    InvalidSize { width: u32, height: u32 },

    /// A texture dimension exceeded the device limit
    #[error("texture size {width}x{height} exceeds the device limit of {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },

    /// The requested particle count was zero
    #[error("particle count must be non-zero")]
    NoParticles,

    /// Color ramp stops could not be rasterized
    #[error("invalid color ramp: {0}")]
    InvalidRamp(String),

    /// Wind field dimensions, ranges, or pixel data were inconsistent
    #[error("invalid wind field: {0}")]
    InvalidField(String),

    /// An I/O error occurred while loading wind data
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The wind metadata sidecar could not be parsed
    #[error("wind metadata parse error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The wind image could not be decoded
    #[error("wind image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::NoWindField;
        assert_eq!(err.to_string(), "no wind field bound; call set_wind before draw");

        let err = Error::InvalidSize {
            width: 0,
            height: 600,
        };
        assert_eq!(
            err.to_string(),
            "invalid surface size 0x600; both dimensions must be non-zero"
        );

        let err = Error::TextureTooLarge {
            width: 8367,
            height: 8367,
            limit: 8192,
        };
        assert_eq!(
            err.to_string(),
            "texture size 8367x8367 exceeds the device limit of 8192"
        );

        let err = Error::ShaderBuild {
            label: "draw".to_string(),
            message: "unknown identifier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "shader 'draw' failed validation: unknown identifier"
        );
    }
}
