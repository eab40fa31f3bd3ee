//! Device wrapper, shader builder, and texture/buffer factory
//!
//! `GpuContext` owns the wgpu device and queue plus the two shared samplers,
//! and provides the small factory surface the rest of the crate builds on:
//! validated shader modules, RGBA8 textures (optionally uploaded), ping-pong
//! texture pairs, static vertex buffers, and staging-buffer readback.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::{Error, Result};

/// Shared GPU handles and samplers
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
}

impl GpuContext {
    /// Wrap an existing device and queue
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device,
            queue,
            nearest_sampler,
            linear_sampler,
        }
    }

    /// Acquire an adapter and device without a surface
    pub fn headless() -> Result<Self> {
        let (device, queue) = pollster::block_on(create_device())?;
        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Get the device
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the queue
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Clamp-to-edge sampler with nearest filtering, for data textures
    pub fn nearest_sampler(&self) -> &wgpu::Sampler {
        &self.nearest_sampler
    }

    /// Clamp-to-edge sampler with linear filtering, for wind and ramp
    /// textures
    pub fn linear_sampler(&self) -> &wgpu::Sampler {
        &self.linear_sampler
    }

    /// Compile WGSL into a validated shader module.
    ///
    /// Compiler diagnostics are captured through a validation error scope
    /// and surfaced as [`Error::ShaderBuild`]; a failed shader is never
    /// handed to a pipeline.
    pub fn create_shader(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::ShaderBuild {
                label: label.to_string(),
                message: error.to_string(),
            });
        }
        Ok(module)
    }

    /// Reject texture dimensions the device cannot allocate.
    ///
    /// Callers check before creating textures sized from outside input, so
    /// an oversized request surfaces as [`Error::TextureTooLarge`] instead
    /// of an uncaptured device validation error.
    pub fn check_texture_size(&self, width: u32, height: u32) -> Result<()> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(Error::TextureTooLarge {
                width,
                height,
                limit,
            });
        }
        Ok(())
    }

    /// Create an RGBA8 2D texture, optionally uploading initial texels.
    ///
    /// The format is always linear (not sRGB): state bytes must round-trip
    /// through the texture exactly. Without initial data the texture starts
    /// zeroed.
    pub fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        if let Some(data) = data {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                size,
            );
        }

        texture
    }

    /// Create a ping-pong texture pair; both members start with the same
    /// content
    pub fn create_texture_pair(
        &self,
        label: &str,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> TexturePair {
        let first = self.create_texture(&format!("{label} 0"), width, height, data);
        let second = self.create_texture(&format!("{label} 1"), width, height, data);
        TexturePair::new(first, second)
    }

    /// Create a static vertex buffer from f32 data
    pub fn create_vertex_buffer(&self, label: &str, data: &[f32]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            })
    }

    /// Create a writable uniform buffer of the given size
    pub fn create_uniform_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Read a texture back as tightly packed RGBA bytes.
    ///
    /// Blocks until the GPU finishes. Copy rows must be 256-byte aligned,
    /// so the staging buffer is padded and the padding stripped on the way
    /// out.
    pub fn read_texture(&self, texture: &wgpu::Texture, width: u32, height: u32) -> Vec<u8> {
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().expect("Failed to map staging buffer");

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let start = (y * padded_bytes_per_row) as usize;
            let end = start + unpadded_bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..end]);
        }
        drop(data);
        staging_buffer.unmap();

        pixels
    }
}

/// Acquire a device and queue without a surface
pub async fn create_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(Error::NoAdapter)?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Windflow Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None, // trace path
        )
        .await?;

    Ok((device, queue))
}

/// Two same-sized textures whose roles swap once per frame
///
/// Swapping flips an index; texture contents are never copied. The source
/// is read by the current frame, the target written, and `swap` exchanges
/// the roles for the next frame.
pub struct TexturePair {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    current: usize,
}

impl TexturePair {
    fn new(first: wgpu::Texture, second: wgpu::Texture) -> Self {
        let views = [
            first.create_view(&wgpu::TextureViewDescriptor::default()),
            second.create_view(&wgpu::TextureViewDescriptor::default()),
        ];
        Self {
            textures: [first, second],
            views,
            current: 0,
        }
    }

    /// Texture read this frame
    pub fn source_texture(&self) -> &wgpu::Texture {
        &self.textures[self.current]
    }

    /// Texture written this frame
    pub fn target_texture(&self) -> &wgpu::Texture {
        &self.textures[1 - self.current]
    }

    /// View of the source texture
    pub fn source_view(&self) -> &wgpu::TextureView {
        &self.views[self.current]
    }

    /// View of the target texture
    pub fn target_view(&self) -> &wgpu::TextureView {
        &self.views[1 - self.current]
    }

    /// Which member currently holds the source role (0 or 1)
    pub fn index(&self) -> usize {
        self.current
    }

    /// Exchange the source and target roles
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}
