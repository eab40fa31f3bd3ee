//! Wind field input
//!
//! A wind field arrives as an RGBA raster (channel 0 = normalized u,
//! channel 1 = normalized v) plus per-axis physical ranges. Fields are
//! validated on ingest; the renderer trusts them afterwards.
//!
//! The on-disk form is a JSON metadata sidecar next to a PNG, the layout
//! produced by the usual wind-data preprocessing scripts.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Metadata sidecar describing a wind image (`wind.json`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindMetadata {
    /// Raster width in texels
    pub width: u32,
    /// Raster height in texels
    pub height: u32,
    /// Physical u velocity encoded as 0
    pub u_min: f32,
    /// Physical u velocity encoded as 255
    pub u_max: f32,
    /// Physical v velocity encoded as 0
    pub v_min: f32,
    /// Physical v velocity encoded as 255
    pub v_max: f32,
}

/// A validated 2D vector field
///
/// Immutable once constructed; rebinding a renderer to a new field replaces
/// the GPU texture but never touches particle state.
#[derive(Debug, Clone)]
pub struct WindField {
    /// Raster width in texels
    pub width: u32,
    /// Raster height in texels
    pub height: u32,
    /// Physical u range
    pub u_min: f32,
    pub u_max: f32,
    /// Physical v range
    pub v_min: f32,
    pub v_max: f32,
    /// RGBA texels, row-major; r = normalized u, g = normalized v
    pub pixels: Vec<u8>,
}

impl WindField {
    /// Build a field from raw RGBA texels and physical ranges
    pub fn new(
        width: u32,
        height: u32,
        u_range: (f32, f32),
        v_range: (f32, f32),
        pixels: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidField(format!(
                "raster size {width}x{height} has a zero dimension"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidField(format!(
                "pixel buffer holds {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        let (u_min, u_max) = u_range;
        let (v_min, v_max) = v_range;
        if u_min > u_max || v_min > v_max {
            return Err(Error::InvalidField(format!(
                "inverted velocity range (u: {u_min}..{u_max}, v: {v_min}..{v_max})"
            )));
        }
        Ok(Self {
            width,
            height,
            u_min,
            u_max,
            v_min,
            v_max,
            pixels,
        })
    }

    /// Load a field from a JSON metadata sidecar and its PNG raster
    pub fn from_files(metadata_path: &Path, image_path: &Path) -> Result<Self> {
        let metadata: WindMetadata =
            serde_json::from_str(&std::fs::read_to_string(metadata_path)?)?;
        let image = image::open(image_path)?.to_rgba8();
        let (img_width, img_height) = image.dimensions();
        if (img_width, img_height) != (metadata.width, metadata.height) {
            return Err(Error::InvalidField(format!(
                "image is {img_width}x{img_height} but metadata says {}x{}",
                metadata.width, metadata.height
            )));
        }
        Self::new(
            metadata.width,
            metadata.height,
            (metadata.u_min, metadata.u_max),
            (metadata.v_min, metadata.v_max),
            image.into_raw(),
        )
    }

    /// Generate a smooth solid-body vortex, for demos and tests without data
    /// files
    pub fn synthetic(width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let nx = (x as f32 + 0.5) / width as f32;
                let ny = (y as f32 + 0.5) / height as f32;
                let u = -(ny - 0.5) * 2.0;
                let v = (nx - 0.5) * 2.0;
                pixels.push(normalize_to_byte(u, -1.0, 1.0));
                pixels.push(normalize_to_byte(v, -1.0, 1.0));
                pixels.push(0);
                pixels.push(255);
            }
        }
        Self {
            width,
            height,
            u_min: -1.0,
            u_max: 1.0,
            v_min: -1.0,
            v_max: 1.0,
            pixels,
        }
    }
}

fn normalize_to_byte(value: f32, min: f32, max: f32) -> u8 {
    (((value - min) / (max - min)).clamp(0.0, 1.0) * 255.0).round() as u8
}
