//! Frame orchestration
//!
//! `WindRenderer` owns every GPU resource of the visualization and drives
//! the three passes of a frame: composite faded trails plus fresh particle
//! points into the accumulation target, present the result, and advect the
//! particle state. All three are recorded into one command encoder and
//! submitted once, so a frame either happens completely or not at all.
//! After submission the two ping-pong pairs swap roles by index.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::context::{GpuContext, TexturePair};
use crate::error::{Error, Result};
use crate::field::WindField;
use crate::particles::ParticleState;
use crate::ramp::{DEFAULT_RAMP, build_ramp};
use crate::shaders::{draw_shader, quad_shader, update_shader};
use crate::types::{
    DEFAULT_DROP_RATE, DEFAULT_DROP_RATE_BUMP, DEFAULT_FADE_OPACITY, DEFAULT_SPEED_FACTOR,
    DrawUniforms, RAMP_WIDTH, RendererConfig, ScreenUniforms, UpdateUniforms,
};

/// Unit-square corners as two triangles, shared by every full-surface pass
const QUAD_VERTICES: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

/// A bound wind field: CPU-side metadata plus its GPU texture
struct BoundWind {
    field: WindField,
    // Kept alive alongside the view
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// GPU-resident wind particle visualizer.
///
/// Construction uploads the initial particle scatter, the default color
/// ramp, and the empty trail accumulation pair. A wind field must be bound
/// with [`set_wind`](Self::set_wind) before the first [`draw`](Self::draw).
///
/// The four tunable parameters are plain fields; changes apply from the
/// next frame. Mutating entry points take `&mut self`, so a renderer can
/// only be driven from one place at a time.
pub struct WindRenderer {
    ctx: GpuContext,
    width: u32,
    height: u32,

    /// Fraction of the previous frame kept when fading trails
    pub fade_opacity: f32,
    /// Advection speed multiplier
    pub speed_factor: f32,
    /// Base per-frame probability of respawning a particle
    pub drop_rate: f32,
    /// Extra respawn probability for the fastest particles
    pub drop_rate_bump: f32,

    rng: StdRng,

    fade_pipeline: wgpu::RenderPipeline,
    present_pipeline: wgpu::RenderPipeline,
    draw_pipeline: wgpu::RenderPipeline,
    update_pipeline: wgpu::RenderPipeline,

    // Layouts are kept because bind groups are rebuilt every frame
    quad_bind_group_layout: wgpu::BindGroupLayout,
    draw_bind_group_layout: wgpu::BindGroupLayout,
    update_bind_group_layout: wgpu::BindGroupLayout,

    quad_buffer: wgpu::Buffer,
    fade_uniform_buffer: wgpu::Buffer,
    present_uniform_buffer: wgpu::Buffer,
    draw_uniform_buffer: wgpu::Buffer,
    update_uniform_buffer: wgpu::Buffer,

    particles: ParticleState,
    screen: TexturePair,
    frame_texture: wgpu::Texture,
    frame_view: wgpu::TextureView,
    ramp_texture: wgpu::Texture,
    ramp_view: wgpu::TextureView,
    wind: Option<BoundWind>,
}

impl WindRenderer {
    /// Create a renderer on an existing device and queue.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: RendererConfig,
    ) -> Result<Self> {
        Self::validate_config(&config)?;
        Self::with_context(GpuContext::new(device, queue), config)
    }

    /// Create a renderer on a freshly acquired headless device.
    pub fn headless(config: RendererConfig) -> Result<Self> {
        Self::validate_config(&config)?;
        Self::with_context(GpuContext::headless()?, config)
    }

    fn validate_config(config: &RendererConfig) -> Result<()> {
        if config.width == 0 || config.height == 0 {
            return Err(Error::InvalidSize {
                width: config.width,
                height: config.height,
            });
        }
        if config.num_particles == 0 {
            return Err(Error::NoParticles);
        }
        Ok(())
    }

    fn with_context(ctx: GpuContext, config: RendererConfig) -> Result<Self> {
        ctx.check_texture_size(config.width, config.height)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let draw_module = ctx.create_shader("draw", &draw_shader())?;
        let quad_module = ctx.create_shader("quad", &quad_shader())?;
        let update_module = ctx.create_shader("update", &update_shader())?;

        let device = ctx.device();

        let quad_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                    sampler_entry(1, wgpu::ShaderStages::FRAGMENT),
                    uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
                ],
            });

        // The particle state is read in the vertex stage to place points
        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::ShaderStages::VERTEX),
                    texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(2, wgpu::ShaderStages::FRAGMENT),
                    sampler_entry(3, wgpu::ShaderStages::FRAGMENT),
                    uniform_entry(4, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                ],
            });

        let update_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Update Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                    uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
                ],
            });

        let quad_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[&quad_bind_group_layout],
            push_constant_ranges: &[],
        });
        let draw_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw Pipeline Layout"),
            bind_group_layouts: &[&draw_bind_group_layout],
            push_constant_ranges: &[],
        });
        let update_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Update Pipeline Layout"),
                bind_group_layouts: &[&update_bind_group_layout],
                push_constant_ranges: &[],
            });

        // The fade copy overwrites every pixel of its target, so it blends
        // nothing; the present copy alpha-blends over the cleared frame
        let fade_pipeline = quad_pipeline(
            device,
            "Fade Pipeline",
            &quad_pipeline_layout,
            &quad_module,
            "vs_quad",
            "fs_quad",
            None,
        );
        let present_pipeline = quad_pipeline(
            device,
            "Present Pipeline",
            &quad_pipeline_layout,
            &quad_module,
            "vs_quad",
            "fs_quad",
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );
        let update_pipeline = quad_pipeline(
            device,
            "Update Pipeline",
            &update_pipeline_layout,
            &update_module,
            "vs_update",
            "fs_update",
            None,
        );

        let draw_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Draw Pipeline"),
            layout: Some(&draw_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &draw_module,
                entry_point: Some("vs_draw"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<f32>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &draw_module,
                entry_point: Some("fs_draw"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let quad_buffer = ctx.create_vertex_buffer("Quad Vertex Buffer", &QUAD_VERTICES);

        let fade_uniform_buffer = ctx.create_uniform_buffer(
            "Fade Uniform Buffer",
            std::mem::size_of::<ScreenUniforms>() as u64,
        );
        let present_uniform_buffer = ctx.create_uniform_buffer(
            "Present Uniform Buffer",
            std::mem::size_of::<ScreenUniforms>() as u64,
        );
        let draw_uniform_buffer = ctx.create_uniform_buffer(
            "Draw Uniform Buffer",
            std::mem::size_of::<DrawUniforms>() as u64,
        );
        let update_uniform_buffer = ctx.create_uniform_buffer(
            "Update Uniform Buffer",
            std::mem::size_of::<UpdateUniforms>() as u64,
        );

        // The present pass always copies at full opacity
        ctx.queue().write_buffer(
            &present_uniform_buffer,
            0,
            bytemuck::bytes_of(&ScreenUniforms {
                opacity: 1.0,
                _padding: [0.0; 3],
            }),
        );

        let particles = ParticleState::new(&ctx, config.num_particles, &mut rng)?;
        let screen = ctx.create_texture_pair("Screen Texture", config.width, config.height, None);
        let frame_texture = ctx.create_texture("Frame Texture", config.width, config.height, None);
        let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let ramp_pixels = build_ramp(&DEFAULT_RAMP)?;
        let ramp_texture =
            ctx.create_texture("Color Ramp Texture", RAMP_WIDTH, 1, Some(&ramp_pixels));
        let ramp_view = ramp_texture.create_view(&wgpu::TextureViewDescriptor::default());

        debug!(
            width = config.width,
            height = config.height,
            particles = particles.count(),
            "renderer ready"
        );

        Ok(Self {
            ctx,
            width: config.width,
            height: config.height,
            fade_opacity: DEFAULT_FADE_OPACITY,
            speed_factor: DEFAULT_SPEED_FACTOR,
            drop_rate: DEFAULT_DROP_RATE,
            drop_rate_bump: DEFAULT_DROP_RATE_BUMP,
            rng,
            fade_pipeline,
            present_pipeline,
            draw_pipeline,
            update_pipeline,
            quad_bind_group_layout,
            draw_bind_group_layout,
            update_bind_group_layout,
            quad_buffer,
            fade_uniform_buffer,
            present_uniform_buffer,
            draw_uniform_buffer,
            update_uniform_buffer,
            particles,
            screen,
            frame_texture,
            frame_view,
            ramp_texture,
            ramp_view,
            wind: None,
        })
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Actual particle count, the requested count rounded up to a perfect
    /// square.
    pub fn num_particles(&self) -> u32 {
        self.particles.count()
    }

    /// Replace the particle population, discarding all current positions.
    ///
    /// Returns the actual count.
    pub fn set_num_particles(&mut self, requested: u32) -> Result<u32> {
        self.particles = ParticleState::new(&self.ctx, requested, &mut self.rng)?;
        debug!(
            requested,
            actual = self.particles.count(),
            "particle population rebuilt"
        );
        Ok(self.particles.count())
    }

    /// Bind a wind field, replacing any previous one.
    ///
    /// Particle state is untouched; the next frame advects through the new
    /// field. A field larger than the device texture limit is rejected and
    /// the previous binding stays in place.
    pub fn set_wind(&mut self, field: WindField) -> Result<()> {
        self.ctx.check_texture_size(field.width, field.height)?;
        let texture = self.ctx.create_texture(
            "Wind Texture",
            field.width,
            field.height,
            Some(&field.pixels),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        debug!(width = field.width, height = field.height, "wind field bound");
        self.wind = Some(BoundWind {
            field,
            _texture: texture,
            view,
        });
        Ok(())
    }

    /// Replace the speed color ramp.
    pub fn set_color_ramp(&mut self, stops: &[(f32, &str)]) -> Result<()> {
        let pixels = build_ramp(stops)?;
        self.ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.ramp_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(RAMP_WIDTH * 4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: RAMP_WIDTH,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Resize the drawing surface.
    ///
    /// Both accumulation textures and the presented frame restart empty, so
    /// trails never stretch across a size change. Particle state survives.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        self.ctx.check_texture_size(width, height)?;
        self.width = width;
        self.height = height;
        self.screen = self
            .ctx
            .create_texture_pair("Screen Texture", width, height, None);
        self.frame_texture = self.ctx.create_texture("Frame Texture", width, height, None);
        self.frame_view = self
            .frame_texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        debug!(width, height, "surface resized");
        Ok(())
    }

    /// Advance the visualization by one frame.
    ///
    /// Records the composite, present, and update passes into one command
    /// encoder and submits once, then swaps both ping-pong pairs. Fails
    /// without touching the GPU if no wind field is bound.
    pub fn draw(&mut self) -> Result<()> {
        let wind = self.wind.as_ref().ok_or(Error::NoWindField)?;

        let wind_min = [wind.field.u_min, wind.field.v_min];
        let wind_max = [wind.field.u_max, wind.field.v_max];

        let draw_uniforms = DrawUniforms {
            wind_min,
            wind_max,
            state_resolution: self.particles.resolution() as f32,
            _padding: [0.0; 3],
        };
        let fade_uniforms = ScreenUniforms {
            opacity: self.fade_opacity,
            _padding: [0.0; 3],
        };
        let update_uniforms = UpdateUniforms {
            wind_min,
            wind_max,
            wind_resolution: [wind.field.width as f32, wind.field.height as f32],
            rand_seed: self.rng.random(),
            speed_factor: self.speed_factor,
            drop_rate: self.drop_rate,
            drop_rate_bump: self.drop_rate_bump,
            _padding: [0.0; 2],
        };

        let queue = self.ctx.queue();
        queue.write_buffer(
            &self.draw_uniform_buffer,
            0,
            bytemuck::bytes_of(&draw_uniforms),
        );
        queue.write_buffer(
            &self.fade_uniform_buffer,
            0,
            bytemuck::bytes_of(&fade_uniforms),
        );
        queue.write_buffer(
            &self.update_uniform_buffer,
            0,
            bytemuck::bytes_of(&update_uniforms),
        );

        // Bind groups are rebuilt each frame because the ping-pong roles
        // rotate underneath them
        let fade_bind_group = self.quad_bind_group(
            "Fade Bind Group",
            self.screen.source_view(),
            &self.fade_uniform_buffer,
        );
        let present_bind_group = self.quad_bind_group(
            "Present Bind Group",
            self.screen.target_view(),
            &self.present_uniform_buffer,
        );
        let draw_bind_group = self.draw_bind_group(&wind.view);
        let update_bind_group = self.update_bind_group(&wind.view);

        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Pass 1: fade the previous frame into the accumulation target and
        // draw every particle on top. The fade quad overwrites every pixel,
        // so the attachment is loaded rather than cleared.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.screen.target_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.fade_pipeline);
            pass.set_bind_group(0, &fade_bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);

            pass.set_pipeline(&self.draw_pipeline);
            pass.set_bind_group(0, &draw_bind_group, &[]);
            pass.set_vertex_buffer(0, self.particles.index_buffer().slice(..));
            pass.draw(0..self.particles.count(), 0..1);
        }

        // Pass 2: present onto the frame texture, cleared every frame like
        // a surface that does not preserve its buffer
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.frame_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.present_pipeline);
            pass.set_bind_group(0, &present_bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }

        // Pass 3: advect every particle into the other state texture
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Update Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.particles.target_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.update_pipeline);
            pass.set_bind_group(0, &update_bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }

        self.ctx.queue().submit(std::iter::once(encoder.finish()));

        // Role swaps are index flips; texture contents are never copied
        self.screen.swap();
        self.particles.swap();

        Ok(())
    }

    /// Read the presented frame back as tightly packed RGBA bytes.
    ///
    /// Blocks until the GPU finishes the outstanding frame.
    pub fn read_pixels(&self) -> Vec<u8> {
        self.ctx
            .read_texture(&self.frame_texture, self.width, self.height)
    }

    fn quad_bind_group(
        &self,
        label: &str,
        view: &wgpu::TextureView,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.ctx
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.quad_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(self.ctx.nearest_sampler()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
    }

    fn draw_bind_group(&self, wind_view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.ctx
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Draw Bind Group"),
                layout: &self.draw_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(self.particles.source_view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(wind_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&self.ramp_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(self.ctx.linear_sampler()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: self.draw_uniform_buffer.as_entire_binding(),
                    },
                ],
            })
    }

    fn update_bind_group(&self, wind_view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.ctx
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Update Bind Group"),
                layout: &self.update_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(self.particles.source_view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(wind_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.update_uniform_buffer.as_entire_binding(),
                    },
                ],
            })
    }
}

fn quad_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    vs_entry: &str,
    fs_entry: &str,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                }],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::Rgba8Unorm,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::{decode_position, encode_position};
    use crate::types::{POSITION_QUANTUM, STEP_SCALE};

    fn test_renderer(config: RendererConfig) -> Option<WindRenderer> {
        match WindRenderer::headless(config) {
            Ok(renderer) => Some(renderer),
            Err(Error::NoAdapter) => {
                eprintln!("skipping: no GPU adapter available");
                None
            }
            Err(err) => panic!("renderer construction failed: {err}"),
        }
    }

    fn small_config(num_particles: u32) -> RendererConfig {
        RendererConfig {
            width: 64,
            height: 48,
            num_particles,
            seed: Some(12345),
        }
    }

    /// Field with zero velocity everywhere (degenerate min == max ranges)
    fn still_field() -> WindField {
        WindField::new(2, 2, (0.0, 0.0), (0.0, 0.0), vec![0u8; 16]).unwrap()
    }

    /// 2x2 field with u = 0 and v = 10 at every texel
    fn uniform_up_field() -> WindField {
        let texel = [0u8, 255, 0, 255];
        let mut pixels = Vec::new();
        for _ in 0..4 {
            pixels.extend_from_slice(&texel);
        }
        WindField::new(2, 2, (0.0, 10.0), (0.0, 10.0), pixels).unwrap()
    }

    /// Overwrite the current state texture so every particle sits at (x, y)
    fn seed_positions(renderer: &WindRenderer, x: f32, y: f32) {
        let resolution = renderer.particles.resolution();
        let texel = encode_position(x, y);
        let mut raster = Vec::with_capacity((resolution * resolution * 4) as usize);
        for _ in 0..resolution * resolution {
            raster.extend_from_slice(&texel);
        }
        renderer.ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: renderer.particles.source_texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &raster,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(resolution * 4),
                rows_per_image: Some(resolution),
            },
            wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
        );
    }

    fn read_state(renderer: &WindRenderer) -> Vec<u8> {
        let resolution = renderer.particles.resolution();
        renderer
            .ctx
            .read_texture(renderer.particles.source_texture(), resolution, resolution)
    }

    #[test]
    fn construction_rejects_zero_size() {
        let config = RendererConfig {
            width: 0,
            height: 600,
            ..RendererConfig::default()
        };
        assert!(matches!(
            WindRenderer::headless(config),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn construction_rejects_zero_particles() {
        let config = RendererConfig {
            num_particles: 0,
            ..RendererConfig::default()
        };
        assert!(matches!(
            WindRenderer::headless(config),
            Err(Error::NoParticles)
        ));
    }

    #[test]
    fn test_construction_rejects_oversized_surface() {
        let Some(renderer) = test_renderer(small_config(16)) else {
            return;
        };
        let limit = renderer.ctx.device().limits().max_texture_dimension_2d;
        drop(renderer);

        let config = RendererConfig {
            width: limit + 1,
            height: 100,
            ..small_config(16)
        };
        assert!(matches!(
            WindRenderer::headless(config),
            Err(Error::TextureTooLarge { .. })
        ));
    }

    #[test]
    fn test_draw_requires_wind_field() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        assert!(matches!(renderer.draw(), Err(Error::NoWindField)));
    }

    #[test]
    fn test_resize_rejects_zero_dimension() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        assert!(matches!(
            renderer.resize(0, 100),
            Err(Error::InvalidSize { .. })
        ));
        assert!(matches!(
            renderer.resize(100, 0),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_resize_rejects_oversized_dimension() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        let limit = renderer.ctx.device().limits().max_texture_dimension_2d;
        assert!(matches!(
            renderer.resize(limit + 1, 100),
            Err(Error::TextureTooLarge { .. })
        ));
        // The failed resize leaves the surface untouched
        assert_eq!((renderer.width(), renderer.height()), (64, 48));
    }

    #[test]
    fn test_swap_roles_alternate_each_frame() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        renderer.set_wind(still_field()).unwrap();

        let state_slot = renderer.particles.slot();
        let screen_slot = renderer.screen.index();

        renderer.draw().unwrap();
        assert_eq!(renderer.particles.slot(), 1 - state_slot);
        assert_eq!(renderer.screen.index(), 1 - screen_slot);

        renderer.draw().unwrap();
        assert_eq!(renderer.particles.slot(), state_slot);
        assert_eq!(renderer.screen.index(), screen_slot);
    }

    #[test]
    fn test_zero_drop_rate_keeps_state_bytes_stable() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        renderer.set_wind(still_field()).unwrap();
        renderer.drop_rate = 0.0;
        renderer.drop_rate_bump = 0.0;

        seed_positions(&renderer, 0.3, 0.7);
        let before = read_state(&renderer);

        for _ in 0..3 {
            renderer.draw().unwrap();
            assert_eq!(read_state(&renderer), before);
        }
    }

    #[test]
    fn test_full_drop_rate_rerandomizes_every_particle() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        renderer.set_wind(still_field()).unwrap();
        renderer.drop_rate = 1.0;
        renderer.drop_rate_bump = 0.0;

        seed_positions(&renderer, 0.5, 0.5);
        renderer.draw().unwrap();

        let after = read_state(&renderer);
        let texels: Vec<&[u8]> = after.chunks(4).collect();
        // Every particle was reassigned: the seeded position is gone and
        // the respawn positions differ across texels
        assert!(texels.iter().any(|t| *t != encode_position(0.5, 0.5)));
        assert!(texels.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_uniform_field_advects_along_v() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        renderer.set_wind(uniform_up_field()).unwrap();
        renderer.drop_rate = 0.0;
        renderer.drop_rate_bump = 0.0;

        seed_positions(&renderer, 0.5, 0.25);
        renderer.draw().unwrap();

        let expected_dy = 10.0 * renderer.speed_factor * STEP_SCALE;
        let state = read_state(&renderer);
        for texel in state.chunks(4) {
            let (x, y) = decode_position([texel[0], texel[1], texel[2], texel[3]]);
            assert!((x - 0.5).abs() <= POSITION_QUANTUM, "x drifted: {x}");
            assert!(
                (y - (0.25 + expected_dy)).abs() <= 2.0 * POSITION_QUANTUM,
                "y moved to {y}, expected {}",
                0.25 + expected_dy
            );
        }
    }

    #[test]
    fn test_resize_clears_accumulated_trails() {
        let Some(mut renderer) = test_renderer(small_config(64)) else {
            return;
        };
        renderer.set_wind(uniform_up_field()).unwrap();
        for _ in 0..5 {
            renderer.draw().unwrap();
        }

        let state_before = read_state(&renderer);
        renderer.resize(64, 48).unwrap();

        let (w, h) = (renderer.width(), renderer.height());
        let background = renderer
            .ctx
            .read_texture(renderer.screen.source_texture(), w, h);
        let screen = renderer
            .ctx
            .read_texture(renderer.screen.target_texture(), w, h);
        assert!(background.iter().all(|&b| b == 0));
        assert!(screen.iter().all(|&b| b == 0));

        // Particle positions survive the resize
        assert_eq!(read_state(&renderer), state_before);
    }

    #[test]
    fn test_presented_frame_contains_particles() {
        let Some(mut renderer) = test_renderer(small_config(256)) else {
            return;
        };
        renderer.set_wind(still_field()).unwrap();
        renderer.draw().unwrap();

        let pixels = renderer.read_pixels();
        assert_eq!(
            pixels.len(),
            (renderer.width() * renderer.height() * 4) as usize
        );
        assert!(pixels.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_set_num_particles_reports_actual() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        let actual = renderer.set_num_particles(10).unwrap();
        assert_eq!(actual, 16);
        assert_eq!(renderer.num_particles(), 16);
        assert!(matches!(
            renderer.set_num_particles(0),
            Err(Error::NoParticles)
        ));
    }

    #[test]
    fn test_set_num_particles_rejects_oversized_state() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        let limit = renderer.ctx.device().limits().max_texture_dimension_2d;
        let requested = (limit + 1).saturating_mul(limit + 1);
        assert!(matches!(
            renderer.set_num_particles(requested),
            Err(Error::TextureTooLarge { .. })
        ));
        // The previous population survives the rejected rebuild
        assert_eq!(renderer.num_particles(), 16);
    }

    #[test]
    fn test_wind_rebind_preserves_particle_state() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        renderer.set_wind(still_field()).unwrap();
        seed_positions(&renderer, 0.3, 0.7);
        let before = read_state(&renderer);

        renderer.set_wind(uniform_up_field()).unwrap();
        assert_eq!(read_state(&renderer), before);
    }

    #[test]
    fn test_set_wind_rejects_oversized_field() {
        let Some(mut renderer) = test_renderer(small_config(16)) else {
            return;
        };
        let limit = renderer.ctx.device().limits().max_texture_dimension_2d;
        let width = limit + 1;
        let field = WindField::new(
            width,
            1,
            (0.0, 1.0),
            (0.0, 1.0),
            vec![0u8; width as usize * 4],
        )
        .unwrap();
        assert!(matches!(
            renderer.set_wind(field),
            Err(Error::TextureTooLarge { .. })
        ));
        // Nothing was bound, so a frame still fails fast
        assert!(matches!(renderer.draw(), Err(Error::NoWindField)));
    }
}
