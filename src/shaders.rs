//! WGSL shaders for the particle pipeline
//!
//! Three programs: `draw` renders particles as 1-pixel points colored by
//! speed, `quad` copies a texture across the full surface at some opacity
//! (used for both trail fading and presentation), and `update` advects the
//! encoded particle state one step.

use crate::types::STEP_SCALE;

/// Fixed-point position codec shared by the draw and update programs
///
/// Positions are stored per axis as 16-bit values split across two 8-bit
/// channels (high byte first): x in (r, g), y in (b, a). The stored value is
/// `floor(coord * 65536)`, so decoded coordinates lie in [0, 1) on a
/// 1/65536 grid and an encode/decode round trip reproduces the bytes
/// exactly.
pub const STATE_CODEC: &str = r#"
fn decode_position(texel: vec4<f32>) -> vec2<f32> {
    let bytes = floor(texel * 255.0 + 0.5);
    return vec2<f32>(bytes.r * 256.0 + bytes.g, bytes.b * 256.0 + bytes.a) / 65536.0;
}

fn encode_position(pos: vec2<f32>) -> vec4<f32> {
    let q = floor(clamp(pos, vec2<f32>(0.0), vec2<f32>(65535.0 / 65536.0)) * 65536.0);
    let hi = floor(q / 256.0);
    let lo = q - hi * 256.0;
    return vec4<f32>(hi.x, lo.x, hi.y, lo.y) / 255.0;
}
"#;

/// Hash-based pseudo-random generator seeded per texel and per frame
pub const RAND: &str = r#"
const RAND_CONSTANTS: vec3<f32> = vec3<f32>(12.9898, 78.233, 4375.85453);

fn rand(co: vec2<f32>) -> f32 {
    let t = dot(RAND_CONSTANTS.xy, co);
    return fract(sin(t) * (RAND_CONSTANTS.z + t));
}
"#;

/// Particle draw program
///
/// The vertex stage fetches each particle's texel by flattened index and
/// decodes its position; the fragment stage colors the point by sampling
/// the wind at that position and indexing the ramp with normalized speed.
pub const DRAW_SHADER: &str = r#"
struct DrawUniforms {
    wind_min: vec2<f32>,
    wind_max: vec2<f32>,
    state_resolution: f32,
}

@group(0) @binding(0) var state_texture: texture_2d<f32>;
@group(0) @binding(1) var wind_texture: texture_2d<f32>;
@group(0) @binding(2) var ramp_texture: texture_2d<f32>;
@group(0) @binding(3) var field_sampler: sampler;
@group(0) @binding(4) var<uniform> uniforms: DrawUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) particle_pos: vec2<f32>,
}

@vertex
fn vs_draw(@location(0) index: f32) -> VertexOutput {
    let resolution = i32(uniforms.state_resolution);
    let i = i32(index);
    let texel = vec2<i32>(i % resolution, i / resolution);
    let pos = decode_position(textureLoad(state_texture, texel, 0));

    var out: VertexOutput;
    out.clip_position = vec4<f32>(2.0 * pos.x - 1.0, 1.0 - 2.0 * pos.y, 0.0, 1.0);
    out.particle_pos = pos;
    return out;
}

@fragment
fn fs_draw(in: VertexOutput) -> @location(0) vec4<f32> {
    let normalized = textureSample(wind_texture, field_sampler, in.particle_pos).rg;
    let velocity = mix(uniforms.wind_min, uniforms.wind_max, normalized);
    let speed_t = length(velocity) / max(length(uniforms.wind_max), 1e-6);
    return textureSample(ramp_texture, field_sampler, vec2<f32>(clamp(speed_t, 0.0, 1.0), 0.5));
}
"#;

/// Full-surface quad program for the fade and present passes
pub const QUAD_SHADER: &str = r#"
struct ScreenUniforms {
    opacity: f32,
}

@group(0) @binding(0) var screen_texture: texture_2d<f32>;
@group(0) @binding(1) var screen_sampler: sampler;
@group(0) @binding(2) var<uniform> uniforms: ScreenUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_pos: vec2<f32>,
}

@vertex
fn vs_quad(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(2.0 * position.x - 1.0, 1.0 - 2.0 * position.y, 0.0, 1.0);
    out.tex_pos = position;
    return out;
}

@fragment
fn fs_quad(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(screen_texture, screen_sampler, in.tex_pos);
    // floored so trails stored in 8-bit channels keep decaying to zero
    return floor(255.0 * color * uniforms.opacity) / 255.0;
}
"#;

/// Particle update program
///
/// Runs as a full-surface quad over the state grid. Each fragment decodes
/// one particle, advects it through the wind field with wrap-around, rolls
/// the per-frame drop decision, and re-encodes the result.
pub const UPDATE_SHADER: &str = r#"
struct UpdateUniforms {
    wind_min: vec2<f32>,
    wind_max: vec2<f32>,
    wind_resolution: vec2<f32>,
    rand_seed: f32,
    speed_factor: f32,
    drop_rate: f32,
    drop_rate_bump: f32,
}

@group(0) @binding(0) var state_texture: texture_2d<f32>;
@group(0) @binding(1) var wind_texture: texture_2d<f32>;
@group(0) @binding(2) var<uniform> uniforms: UpdateUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_pos: vec2<f32>,
}

@vertex
fn vs_update(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(2.0 * position.x - 1.0, 1.0 - 2.0 * position.y, 0.0, 1.0);
    out.tex_pos = position;
    return out;
}

// Manual bilinear interpolation of the four neighboring wind texels.
// textureLoad keeps each fetch exact; clamping reproduces edge extension.
fn lookup_wind(pos: vec2<f32>) -> vec2<f32> {
    let resolution = uniforms.wind_resolution;
    let scaled = pos * resolution - 0.5;
    let base = vec2<i32>(floor(scaled));
    let f = fract(scaled);
    let zero = vec2<i32>(0);
    let max_texel = vec2<i32>(resolution) - vec2<i32>(1);
    let tl = textureLoad(wind_texture, clamp(base, zero, max_texel), 0).rg;
    let tr = textureLoad(wind_texture, clamp(base + vec2<i32>(1, 0), zero, max_texel), 0).rg;
    let bl = textureLoad(wind_texture, clamp(base + vec2<i32>(0, 1), zero, max_texel), 0).rg;
    let br = textureLoad(wind_texture, clamp(base + vec2<i32>(1, 1), zero, max_texel), 0).rg;
    return mix(mix(tl, tr, f.x), mix(bl, br, f.x), f.y);
}

@fragment
fn fs_update(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = vec2<i32>(floor(in.clip_position.xy));
    var pos = decode_position(textureLoad(state_texture, texel, 0));

    let velocity = mix(uniforms.wind_min, uniforms.wind_max, lookup_wind(pos));
    let speed_t = length(velocity) / max(length(uniforms.wind_max), 1e-6);

    // Advance along the field, wrapping at the edges
    let offset = velocity * uniforms.speed_factor * STEP_SCALE;
    pos = fract(1.0 + pos + offset);

    // Respawn a small fraction of particles each frame, biased toward fast
    // ones so busy regions do not end up hoarding every particle
    let seed = (pos + in.tex_pos) * uniforms.rand_seed;
    let drop = step(1.0 - (uniforms.drop_rate + speed_t * uniforms.drop_rate_bump), rand(seed));
    let random_pos = vec2<f32>(rand(seed + 1.3), rand(seed + 2.1));
    pos = mix(pos, random_pos, drop);

    return encode_position(pos);
}
"#;

/// Get the complete draw shader source
pub fn draw_shader() -> String {
    format!("{}\n{}", STATE_CODEC, DRAW_SHADER)
}

/// Get the complete quad shader source
pub fn quad_shader() -> String {
    QUAD_SHADER.to_string()
}

/// Get the complete update shader source
pub fn update_shader() -> String {
    format!(
        "const STEP_SCALE: f32 = {};\n{}\n{}\n{}",
        STEP_SCALE, STATE_CODEC, RAND, UPDATE_SHADER
    )
}
