//! Particle state textures and the fixed-point position codec
//!
//! Particle positions never live on the CPU: each particle is one RGBA8
//! texel in a square state texture, with x packed into (r, g) and y into
//! (b, a) as 16-bit fixed point, high byte first. Two state textures exist
//! at all times and trade the read/write roles every frame.
//!
//! The Rust codec here is the reference for the WGSL codec in
//! [`crate::shaders::STATE_CODEC`]; both quantize to a 1/65536 grid.

use rand::Rng;
use rand::rngs::StdRng;

use crate::context::{GpuContext, TexturePair};
use crate::error::{Error, Result};

/// Side length of the square state texture holding `requested` particles.
///
/// The count is rounded up to the next perfect square; callers size index
/// data by `state_resolution(n).pow(2)`, not by `n`.
pub fn state_resolution(requested: u32) -> u32 {
    (requested as f64).sqrt().ceil() as u32
}

/// Pack a position into one RGBA8 texel.
///
/// Coordinates are clamped to [0, 1] and quantized to `floor(c * 65536)`,
/// capped at 65535, so decoded values always lie in [0, 1).
pub fn encode_position(x: f32, y: f32) -> [u8; 4] {
    let qx = quantize(x);
    let qy = quantize(y);
    [
        (qx >> 8) as u8,
        (qx & 0xff) as u8,
        (qy >> 8) as u8,
        (qy & 0xff) as u8,
    ]
}

/// Unpack a position from one RGBA8 texel
pub fn decode_position(texel: [u8; 4]) -> (f32, f32) {
    let qx = u16::from_be_bytes([texel[0], texel[1]]);
    let qy = u16::from_be_bytes([texel[2], texel[3]]);
    (qx as f32 / 65536.0, qy as f32 / 65536.0)
}

fn quantize(coord: f32) -> u16 {
    let clamped = coord.clamp(0.0, 1.0);
    ((clamped * 65536.0) as u32).min(65535) as u16
}

/// GPU-resident particle population
pub struct ParticleState {
    pair: TexturePair,
    resolution: u32,
    count: u32,
    index_buffer: wgpu::Buffer,
}

impl ParticleState {
    /// Allocate the state pair and index buffer for `requested` particles.
    ///
    /// The actual population is `state_resolution(requested)` squared, every
    /// particle starting at an independently random position. Rebuilding
    /// discards all previous particle identities.
    pub fn new(ctx: &GpuContext, requested: u32, rng: &mut StdRng) -> Result<Self> {
        if requested == 0 {
            return Err(Error::NoParticles);
        }
        let resolution = state_resolution(requested);
        // Checked before squaring; a near-u32::MAX request rounds up to a
        // resolution of 65536, whose square does not fit in u32
        ctx.check_texture_size(resolution, resolution)?;
        let count = resolution * resolution;

        // Independently random bytes are uniformly random quantized
        // positions, so the initial scatter covers the whole field
        let mut state = vec![0u8; count as usize * 4];
        rng.fill(&mut state[..]);

        let pair = ctx.create_texture_pair("Particle State", resolution, resolution, Some(&state));

        let indices: Vec<f32> = (0..count).map(|i| i as f32).collect();
        let index_buffer = ctx.create_vertex_buffer("Particle Index Buffer", &indices);

        Ok(Self {
            pair,
            resolution,
            count,
            index_buffer,
        })
    }

    /// Side length of the state texture
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Actual particle count (always a perfect square)
    pub fn count(&self) -> u32 {
        self.count
    }

    /// State texture read this frame
    pub fn source_texture(&self) -> &wgpu::Texture {
        self.pair.source_texture()
    }

    /// View of the state texture read this frame
    pub fn source_view(&self) -> &wgpu::TextureView {
        self.pair.source_view()
    }

    /// View of the state texture written this frame
    pub fn target_view(&self) -> &wgpu::TextureView {
        self.pair.target_view()
    }

    /// Which member currently holds the source role (0 or 1)
    pub fn slot(&self) -> usize {
        self.pair.index()
    }

    /// Exchange the read/write roles after a frame
    pub fn swap(&mut self) {
        self.pair.swap();
    }

    /// Per-particle index vertex data (sequential f32 values)
    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }
}
