//! GPU presentation: the current photo, the incoming photo during a
//! cross-fade, and the overlay panels, each drawn as a textured quad.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use tracing::{debug, info, warn};
use wgpu::SurfaceError;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::loader::{PreparedImage, center_offset, fit_size};
use crate::overlay::{OverlayImage, Rect};

const LAYER_SHADER: &str = r"
struct Layer {
    rect: vec4<f32>,
    opacity: vec4<f32>,
};

@group(0) @binding(0) var layer_tex: texture_2d<f32>;
@group(0) @binding(1) var layer_sampler: sampler;
@group(0) @binding(2) var<uniform> layer: Layer;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    let u = f32(vi & 1u);
    let v = f32(vi >> 1u);
    var out: VsOut;
    out.pos = vec4<f32>(
        mix(layer.rect.x, layer.rect.z, u),
        mix(layer.rect.y, layer.rect.w, v),
        0.0,
        1.0,
    );
    out.uv = vec2<f32>(u, v);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSample(layer_tex, layer_sampler, in.uv);
    return vec4<f32>(c.rgb, c.a * layer.opacity.x);
}
";

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LayerUniform {
    /// Left, top, right, bottom in clip space.
    rect: [f32; 4],
    opacity: [f32; 4],
}

/// Convert a window-pixel rectangle to clip-space edges (left, top, right,
/// bottom) for a `surface_w`×`surface_h` target.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ndc_rect(rect: Rect, surface_w: u32, surface_h: u32) -> [f32; 4] {
    let w = surface_w.max(1) as f32;
    let h = surface_h.max(1) as f32;
    [
        rect.x / w * 2.0 - 1.0,
        1.0 - rect.y / h * 2.0,
        (rect.x + rect.w) / w * 2.0 - 1.0,
        1.0 - (rect.y + rect.h) / h * 2.0,
    ]
}

/// Where a photo texture of `size` sits on the surface: centred, and shrunk
/// when the surface got smaller than the viewport it was decoded for.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn photo_rect(size: (u32, u32), surface: (u32, u32)) -> Rect {
    let (w, h) = fit_size(size.0, size.1, surface.0, surface.1, false);
    let (x, y) = center_offset(w, h, surface.0, surface.1);
    Rect {
        x: x as f32,
        y: y as f32,
        w: w as f32,
        h: h as f32,
    }
}

/// Cross-fade progress in `0.0..=1.0`.
#[must_use]
pub fn fade_progress(started: Instant, duration: Duration, now: Instant) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    (now.saturating_duration_since(started).as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = f64::from(c) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

struct Layer {
    size: (u32, u32),
    rect: Rect,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

struct Fade {
    started: Instant,
}

pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    clear: wgpu::Color,
    transition: Duration,
    current: Option<Layer>,
    incoming: Option<Layer>,
    fade: Option<Fade>,
    overlay: Option<Layer>,
    message: Option<Layer>,
}

impl Renderer {
    /// Acquire a GPU device for `window` and build the layer pipeline.
    ///
    /// # Errors
    /// Fails when no adapter or device is available or the surface cannot be
    /// created.
    pub fn new(window: Arc<Window>, background: [u8; 3], transition: Duration) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("slideshow-device"),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "surface configured",
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer-bind-layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline = create_pipeline(&device, &layout, format);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("layer-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let clear = wgpu::Color {
            r: srgb_to_linear(background[0]),
            g: srgb_to_linear(background[1]),
            b: srgb_to_linear(background[2]),
            a: 1.0,
        };

        Ok(Self {
            window,
            surface,
            config,
            device,
            queue,
            pipeline,
            layout,
            sampler,
            clear,
            transition,
            current: None,
            incoming: None,
            fade: None,
            overlay: None,
            message: None,
        })
    }

    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure the surface and re-centre the photos already uploaded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        let surface = self.size();
        for layer in [self.current.as_mut(), self.incoming.as_mut()]
            .into_iter()
            .flatten()
        {
            layer.rect = photo_rect(layer.size, surface);
        }
        debug!(width = surface.0, height = surface.1, "surface resized");
    }

    /// Put a freshly decoded photo on screen, fading from the previous one.
    pub fn set_photo(&mut self, image: &PreparedImage, now: Instant) {
        let size = (image.width, image.height);
        let layer = self.upload(
            "photo",
            size,
            &image.pixels,
            photo_rect(size, self.size()),
        );
        // A fade still in flight is cut short.
        if let Some(previous) = self.incoming.take() {
            self.current = Some(previous);
        }
        if self.current.is_none() || self.transition.is_zero() {
            self.current = Some(layer);
            self.fade = None;
        } else {
            self.incoming = Some(layer);
            self.fade = Some(Fade { started: now });
        }
    }

    /// Swap a photo of the same slide in place, without a fade (used after a
    /// resize re-decode).
    pub fn replace_photo(&mut self, image: &PreparedImage) {
        let size = (image.width, image.height);
        let layer = self.upload("photo", size, &image.pixels, photo_rect(size, self.size()));
        self.incoming = None;
        self.fade = None;
        self.current = Some(layer);
    }

    pub fn clear_photo(&mut self) {
        self.current = None;
        self.incoming = None;
        self.fade = None;
    }

    pub fn set_overlay(&mut self, overlay: Option<OverlayImage>) {
        self.overlay = overlay.map(|o| self.upload_rgba("overlay", &o.image, o.rect));
    }

    pub fn set_message(&mut self, message: Option<OverlayImage>) {
        self.message = message.map(|m| self.upload_rgba("message", &m.image, m.rect));
    }

    /// Whether a cross-fade is still running and needs more frames.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.fade.is_some()
    }

    /// Draw one frame. Returns `Ok(true)` while further frames are needed.
    ///
    /// # Errors
    /// Fails when the GPU runs out of memory; other surface errors are
    /// recovered from.
    pub fn render(&mut self, now: Instant) -> Result<bool> {
        let progress = self
            .fade
            .as_ref()
            .map(|fade| fade_progress(fade.started, self.transition, now));
        if progress.is_some_and(|p| p >= 1.0) {
            if let Some(next) = self.incoming.take() {
                self.current = Some(next);
            }
            self.fade = None;
        }
        let progress = self.fade.as_ref().and(progress);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("surface lost; reconfiguring");
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                return Ok(true);
            }
            Err(SurfaceError::OutOfMemory) => {
                anyhow::bail!("GPU surface out of memory");
            }
            Err(SurfaceError::Timeout) => {
                warn!("surface acquisition timed out");
                return Ok(true);
            }
            Err(SurfaceError::Other) => {
                warn!("surface reported an unknown error; retrying");
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                return Ok(true);
            }
        };

        let surface = self.size();
        let mut draws: Vec<(&Layer, f32)> = Vec::with_capacity(4);
        if let Some(current) = &self.current {
            draws.push((current, progress.map_or(1.0, |p| 1.0 - p)));
        }
        if let (Some(incoming), Some(p)) = (&self.incoming, progress) {
            draws.push((incoming, p));
        }
        if let Some(message) = &self.message {
            draws.push((message, 1.0));
        }
        if let Some(overlay) = &self.overlay {
            draws.push((overlay, 1.0));
        }
        for (layer, opacity) in &draws {
            let uniform = LayerUniform {
                rect: ndc_rect(layer.rect, surface.0, surface.1),
                opacity: [*opacity, 0.0, 0.0, 0.0],
            };
            self.queue
                .write_buffer(&layer.uniform, 0, bytemuck::bytes_of(&uniform));
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slideshow-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slideshow-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            for (layer, _) in &draws {
                pass.set_bind_group(0, &layer.bind_group, &[]);
                pass.draw(0..4, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();

        Ok(self.fade.is_some())
    }

    fn upload_rgba(&self, label: &str, image: &RgbaImage, rect: Rect) -> Layer {
        self.upload(label, image.dimensions(), image.as_raw(), rect)
    }

    fn upload(&self, label: &str, size: (u32, u32), pixels: &[u8], rect: Rect) -> Layer {
        let (w, h) = (size.0.max(1), size.1.max(1));
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&LayerUniform {
                    rect: ndc_rect(rect, self.config.width, self.config.height),
                    opacity: [1.0, 0.0, 0.0, 0.0],
                }),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });
        Layer {
            size: (w, h),
            rect,
            uniform,
            bind_group,
            _texture: texture,
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("layer-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(LAYER_SHADER)),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("layer-pipeline-layout"),
        bind_group_layouts: &[bind_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("layer-pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}
