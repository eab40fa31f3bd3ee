//! Color ramp rasterization
//!
//! Turns a sparse list of gradient stops into the dense 256x1 RGBA lookup
//! texture the draw shader indexes by normalized particle speed. Output is a
//! pure function of the stops, so identical input gives byte-identical
//! texture content.

use crate::error::{Error, Result};
use crate::types::RAMP_WIDTH;

/// Default speed palette, dark blue through pale blue
pub const DEFAULT_RAMP: [(f32, &str); 8] = [
    (0.0, "#003366"),
    (0.1, "#004699"),
    (0.2, "#0055cc"),
    (0.3, "#0066ff"),
    (0.4, "#3399ff"),
    (0.5, "#66ccff"),
    (0.6, "#99ccff"),
    (1.0, "#cce7ff"),
];

/// Rasterize gradient stops into 256x1 RGBA bytes.
///
/// Stops are `(position, "#rrggbb")` pairs with strictly ascending positions
/// in `[0, 1]`; an optional alpha pair (`#rrggbbaa`) is accepted. Entries
/// outside the first/last stop take that stop's color, matching gradient
/// edge clamping.
pub fn build_ramp(stops: &[(f32, &str)]) -> Result<Vec<u8>> {
    if stops.len() < 2 {
        return Err(Error::InvalidRamp(format!(
            "need at least 2 stops, got {}",
            stops.len()
        )));
    }

    let mut parsed = Vec::with_capacity(stops.len());
    for &(position, color) in stops {
        if !(0.0..=1.0).contains(&position) {
            return Err(Error::InvalidRamp(format!(
                "stop position {position} outside [0, 1]"
            )));
        }
        if let Some(&(prev, _)) = parsed.last() {
            if position <= prev {
                return Err(Error::InvalidRamp(format!(
                    "stop positions must be strictly ascending ({prev} then {position})"
                )));
            }
        }
        parsed.push((position, parse_hex_color(color)?));
    }

    let mut pixels = Vec::with_capacity(RAMP_WIDTH as usize * 4);
    for i in 0..RAMP_WIDTH {
        let t = i as f32 / (RAMP_WIDTH - 1) as f32;
        pixels.extend_from_slice(&sample_stops(&parsed, t));
    }
    Ok(pixels)
}

/// Linear per-channel interpolation between the stops bracketing `t`
fn sample_stops(stops: &[(f32, [u8; 4])], t: f32) -> [u8; 4] {
    let (first_pos, first_color) = stops[0];
    if t <= first_pos {
        return first_color;
    }
    let (last_pos, last_color) = stops[stops.len() - 1];
    if t >= last_pos {
        return last_color;
    }

    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let f = (t - p0) / (p1 - p0);
            let mut out = [0u8; 4];
            for (channel, slot) in out.iter_mut().enumerate() {
                let a = c0[channel] as f32;
                let b = c1[channel] as f32;
                *slot = (a + (b - a) * f).round() as u8;
            }
            return out;
        }
    }
    last_color
}

/// Parse `#rrggbb` or `#rrggbbaa` into RGBA bytes (alpha defaults to 255)
fn parse_hex_color(color: &str) -> Result<[u8; 4]> {
    let hex = color.strip_prefix('#').ok_or_else(|| {
        Error::InvalidRamp(format!("color '{color}' must start with '#'"))
    })?;
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return Err(Error::InvalidRamp(format!(
            "color '{color}' must be #rrggbb or #rrggbbaa"
        )));
    }

    let byte_at = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| Error::InvalidRamp(format!("color '{color}' has non-hex digits")))
    };

    let mut rgba = [byte_at(0)?, byte_at(2)?, byte_at(4)?, 255];
    if hex.len() == 8 {
        rgba[3] = byte_at(6)?;
    }
    Ok(rgba)
}
