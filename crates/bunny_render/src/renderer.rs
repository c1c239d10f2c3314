//! Instanced bunny renderer
//!
//! Owns every GPU-side resource for one device lifetime: the static
//! attribute buffer (uploaded once), a ring of position buffers written each
//! frame, the atlas texture and sampler, the screen uniform and the pipeline.
//! [`BunnyRenderer::teardown`] releases all of it explicitly and runs on drop.

use std::sync::Arc;

use bunny_core::StaticSprite;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::{self, DeviceCapabilities};
use crate::device_loss::DeviceLossNotifier;
use crate::error::RenderError;
use crate::ring::{Ring, POSITION_RING_SIZE};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.25,
    a: 1.0,
};

const VERTICES_PER_QUAD: u32 = 6;

const STATIC_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

/// Screen size in physical pixels, for aspect correction in the vertex stage.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenUniform {
    size: glam::Vec2,
    _padding: glam::Vec2,
}

impl ScreenUniform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: glam::Vec2::new(width as f32, height as f32),
            _padding: glam::Vec2::ZERO,
        }
    }

    pub fn size(&self) -> glam::Vec2 {
        self.size
    }
}

/// Decoded RGBA8 atlas handed to setup.
#[derive(Clone, Copy)]
pub struct AtlasImage<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// Everything setup needs besides the window.
pub struct RendererDescriptor<'a> {
    pub atlas: AtlasImage<'a>,
    pub static_data: &'a [StaticSprite],
    pub positions: &'a [f32],
    pub vsync: bool,
}

pub struct BunnyRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    static_buffer: wgpu::Buffer,
    position_ring: Ring<wgpu::Buffer>,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,
    atlas_texture: wgpu::Texture,
    atlas_bind_group: wgpu::BindGroup,
    instance_count: u32,
    torn_down: bool,
}

impl BunnyRenderer {
    /// Acquire a device for `window` and upload the static data, atlas and
    /// initial positions. `on_device_lost` is registered on the new device.
    pub async fn new(
        window: Arc<Window>,
        desc: RendererDescriptor<'_>,
        on_device_lost: DeviceLossNotifier,
    ) -> Result<Self, RenderError> {
        let instance_count = desc.static_data.len();
        let expected_positions = instance_count * 2;
        if desc.positions.len() != expected_positions {
            return Err(RenderError::PositionCountMismatch {
                expected: expected_positions,
                actual: desc.positions.len(),
            });
        }
        let expected_atlas = (desc.atlas.width * desc.atlas.height * 4) as usize;
        if desc.atlas.rgba.len() != expected_atlas {
            return Err(RenderError::AtlasSize {
                width: desc.atlas.width,
                height: desc.atlas.height,
                expected: expected_atlas,
                actual: desc.atlas.rgba.len(),
            });
        }

        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let capabilities = DeviceCapabilities::probe(&adapter);
        tracing::info!(
            backend = ?capabilities.backend,
            adapter = %capabilities.adapter_name,
            max_buffer_size = capabilities.max_buffer_size,
            "selected GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Bunny Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        device.set_device_lost_callback(move |reason, message| {
            tracing::error!(?reason, %message, "GPU device lost");
            on_device_lost.notify(format!("{reason:?}"), message);
        });
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!(%error, "uncaptured wgpu error");
        }));

        let limit = device.limits().max_buffer_size;
        let static_bytes = std::mem::size_of_val(desc.static_data) as u64;
        let position_bytes = std::mem::size_of_val(desc.positions) as u64;
        for (label, requested) in [("static buffer", static_bytes), ("position buffer", position_bytes)] {
            if requested > limit {
                return Err(RenderError::BufferTooLarge {
                    label,
                    requested,
                    limit,
                });
            }
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let format = backend::select_surface_format(&surface_caps.formats)?;
        let alpha_mode = backend::select_alpha_mode(&surface_caps.alpha_modes)?;
        let present_mode = backend::select_present_mode(desc.vsync, &surface_caps.present_modes);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, ?alpha_mode, ?present_mode, "configured surface");

        // Static attributes: written once, never touched again.
        let static_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Static Sprite Buffer"),
            contents: bytemuck::cast_slice(desc.static_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let position_ring = Ring::new(
            (0..POSITION_RING_SIZE)
                .map(|slot| {
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("Position Buffer {slot}")),
                        contents: bytemuck::cast_slice(desc.positions),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    })
                })
                .collect(),
        );

        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Uniform Buffer"),
            contents: bytemuck::bytes_of(&ScreenUniform::new(config.width, config.height)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let screen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Screen Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Screen Bind Group"),
            layout: &screen_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let atlas_texture = upload_atlas(&device, &queue, desc.atlas);
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Clamp keeps linear filtering from bleeding across atlas cells.
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Atlas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bunny Shader"),
            source: wgpu::ShaderSource::Wgsl(crate::SHADER_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bunny Pipeline Layout"),
            bind_group_layouts: &[&screen_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Bunny Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<StaticSprite>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &STATIC_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: (2 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &POSITION_ATTRIBUTES,
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
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

        tracing::info!(
            instances = instance_count,
            ring_slots = POSITION_RING_SIZE,
            width = config.width,
            height = config.height,
            "renderer ready"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            static_buffer,
            position_ring,
            screen_buffer,
            screen_bind_group,
            atlas_texture,
            atlas_bind_group,
            instance_count: instance_count as u32,
            torn_down: false,
        })
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Queue a copy of `positions` into the current ring slot. Does not wait
    /// for the GPU.
    pub fn upload_positions(&mut self, positions: &[f32]) -> Result<(), RenderError> {
        let expected = self.instance_count as usize * 2;
        if positions.len() != expected {
            return Err(RenderError::PositionCountMismatch {
                expected,
                actual: positions.len(),
            });
        }
        self.queue
            .write_buffer(self.position_ring.current(), 0, bytemuck::cast_slice(positions));
        Ok(())
    }

    /// Draw every body with one instanced call and present, then move to the
    /// next ring slot.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Bunny Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bunny Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.screen_bind_group, &[]);
            render_pass.set_bind_group(1, &self.atlas_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.static_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.position_ring.current().slice(..));
            render_pass.draw(0..VERTICES_PER_QUAD, 0..self.instance_count);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.position_ring.advance();

        Ok(())
    }

    /// Apply a new physical size. Zero-sized (minimized) windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.queue.write_buffer(
            &self.screen_buffer,
            0,
            bytemuck::bytes_of(&ScreenUniform::new(width, height)),
        );
        tracing::debug!(width, height, "resized surface");
    }

    /// Reconfigure with the current size after `Lost`/`Outdated`.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Release every buffer, the atlas texture and the device. Safe to call
    /// more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.static_buffer.destroy();
        for buffer in self.position_ring.iter() {
            buffer.destroy();
        }
        self.screen_buffer.destroy();
        self.atlas_texture.destroy();
        self.device.destroy();
        tracing::info!("released GPU resources");
    }
}

impl Drop for BunnyRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn upload_atlas(device: &wgpu::Device, queue: &wgpu::Queue, atlas: AtlasImage<'_>) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: atlas.width,
        height: atlas.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Bunny Atlas"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        atlas.rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * atlas.width),
            rows_per_image: Some(atlas.height),
        },
        size,
    );
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<ScreenUniform>(), 16);
        assert_eq!(ScreenUniform::new(1920, 1080).size(), glam::Vec2::new(1920.0, 1080.0));
    }

    #[test]
    fn vertex_layouts_match_cpu_types() {
        assert_eq!(std::mem::size_of::<StaticSprite>(), 16);
        assert_eq!(STATIC_ATTRIBUTES[1].offset, 8);
        assert_eq!(POSITION_ATTRIBUTES[0].shader_location, 2);
    }
}
