//! windflow - GPU particle visualization of wind fields.
//!
//! Thousands of particles advect through a 2D vector field entirely on the
//! GPU. Particle positions live in ping-pong texture pairs as fixed-point
//! RGBA bytes, motion trails accumulate through an exponential fade, and
//! every frame is three render passes in a single submission.
//!
//! # Example
//!
//! ```rust,ignore
//! use windflow::{RendererConfig, WindField, WindRenderer};
//!
//! let mut renderer = WindRenderer::headless(RendererConfig::default())?;
//! renderer.set_wind(WindField::synthetic(256, 256))?;
//!
//! for _ in 0..120 {
//!     renderer.draw()?;
//! }
//!
//! let pixels = renderer.read_pixels();
//! ```

pub mod context;
pub mod error;
pub mod field;
pub mod particles;
pub mod ramp;
pub mod renderer;
pub mod shaders;
pub mod types;

pub use context::{GpuContext, TexturePair, create_device};
pub use error::{Error, Result};
pub use field::{WindField, WindMetadata};
pub use particles::{ParticleState, decode_position, encode_position, state_resolution};
pub use ramp::{DEFAULT_RAMP, build_ramp};
pub use renderer::WindRenderer;
pub use types::{
    // Default parameters, overridable per renderer
    DEFAULT_DROP_RATE,
    DEFAULT_DROP_RATE_BUMP,
    DEFAULT_FADE_OPACITY,
    DEFAULT_NUM_PARTICLES,
    DEFAULT_SPEED_FACTOR,
    POSITION_QUANTUM,
    RendererConfig,
};
