//! GPU uniform types and renderer configuration
//!
//! Uniform structs are uploaded directly to GPU buffers. All use f32 for GPU
//! compatibility and are repr(C) with explicit padding so the layout matches
//! the WGSL uniform blocks.

use bytemuck::{Pod, Zeroable};

// =============================================================================
// Default Constants
// =============================================================================

/// Default trail persistence (fraction of the previous frame kept each frame)
pub const DEFAULT_FADE_OPACITY: f32 = 0.996;

/// Default advection speed multiplier
pub const DEFAULT_SPEED_FACTOR: f32 = 0.25;

/// Default per-frame probability of respawning a particle at a random position
pub const DEFAULT_DROP_RATE: f32 = 0.003;

/// Default extra drop probability added for the fastest particles
pub const DEFAULT_DROP_RATE_BUMP: f32 = 0.01;

/// Default number of particles (perfect square, 256x256 state texture)
pub const DEFAULT_NUM_PARTICLES: u32 = 65536;

/// Normalization applied to field velocities before advancing particle
/// positions, so speed_factor stays in a comfortable 0-1ish range
pub const STEP_SCALE: f32 = 0.0001;

/// Width of the rasterized color ramp texture (height is 1)
pub const RAMP_WIDTH: u32 = 256;

/// Quantization step of the 16-bit fixed-point position encoding
pub const POSITION_QUANTUM: f32 = 1.0 / 65536.0;

/// Uniforms for the particle draw program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Per-axis minimum physical velocity of the wind field
    pub wind_min: [f32; 2],
    /// Per-axis maximum physical velocity of the wind field
    pub wind_max: [f32; 2],
    /// Side length of the square particle state texture
    pub state_resolution: f32,
    /// Padding for 16-byte alignment
    pub _padding: [f32; 3],
}

/// Uniforms for the full-surface quad program (fade and present passes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ScreenUniforms {
    /// Opacity applied to the sampled texture
    pub opacity: f32,
    /// Padding for 16-byte alignment
    pub _padding: [f32; 3],
}

/// Uniforms for the particle update program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UpdateUniforms {
    /// Per-axis minimum physical velocity of the wind field
    pub wind_min: [f32; 2],
    /// Per-axis maximum physical velocity of the wind field
    pub wind_max: [f32; 2],
    /// Wind texture dimensions in texels
    pub wind_resolution: [f32; 2],
    /// Fresh random seed for this frame's drop decisions
    pub rand_seed: f32,
    /// Advection speed multiplier
    pub speed_factor: f32,
    /// Base per-frame respawn probability
    pub drop_rate: f32,
    /// Extra respawn probability for fast particles
    pub drop_rate_bump: f32,
    /// Padding for 16-byte alignment
    pub _padding: [f32; 2],
}

/// Construction-time configuration for [`crate::WindRenderer`]
///
/// The four per-frame simulation parameters are plain public fields on the
/// renderer instead; they can change between any two frames.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Drawing surface width in pixels
    pub width: u32,
    /// Drawing surface height in pixels
    pub height: u32,
    /// Requested particle count (rounded up to the next perfect square)
    pub num_particles: u32,
    /// RNG seed for reproducible particle placement and drop decisions
    pub seed: Option<u64>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            num_particles: DEFAULT_NUM_PARTICLES,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_uniforms_size() {
        // 2 vec2 + 1 f32 + 3 f32 padding = 8 floats = 32 bytes
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 32);
    }

    #[test]
    fn test_screen_uniforms_size() {
        assert_eq!(std::mem::size_of::<ScreenUniforms>(), 16);
    }

    #[test]
    fn test_update_uniforms_size() {
        // 3 vec2 + 4 f32 + 2 f32 padding = 12 floats = 48 bytes
        assert_eq!(std::mem::size_of::<UpdateUniforms>(), 48);
    }

    #[test]
    fn test_uniforms_alignment() {
        // Uniform buffer bindings require 16-byte aligned sizes
        assert_eq!(std::mem::size_of::<DrawUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ScreenUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<UpdateUniforms>() % 16, 0);
    }

    #[test]
    fn test_renderer_config_default() {
        let config = RendererConfig::default();
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
        assert_eq!(config.num_particles, DEFAULT_NUM_PARTICLES);
        assert!(config.seed.is_none());
    }
}
