use std::time::{Duration, Instant};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::warn;
use winit::dpi::PhysicalSize;

use crate::render_loop::{FrameError, FrameSink, UniformSet};
use crate::types::{Antialiasing, ColorSpaceMode, RenderSetupError};

use super::context::GpuContext;
use super::pipeline::{BackgroundPipeline, PipelineLayouts};
use super::uniforms::BackgroundUniforms;

/// Acquiring a frame slower than this is logged.
const ACQUIRE_BUDGET: Duration = Duration::from_millis(50);

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Surface, device and the one background pipeline of a mounted window.
pub(crate) struct GpuState {
    context: GpuContext,
    _layouts: PipelineLayouts,
    pipeline: BackgroundPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    multisample_target: Option<MultisampleTarget>,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self, RenderSetupError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, color_space)?;
        let layouts = PipelineLayouts::new(&context.device);
        let pipeline = BackgroundPipeline::new(
            &context.device,
            &layouts,
            context.surface_format,
            context.sample_count,
        )?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform buffer"),
            size: std::mem::size_of::<BackgroundUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let initial = BackgroundUniforms::from_set(&UniformSet::initial((
            context.size.width,
            context.size.height,
        )));
        context
            .queue
            .write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&initial));

        let multisample_target = Self::multisample_target(&context);

        Ok(Self {
            context,
            _layouts: layouts,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            multisample_target,
        })
    }

    fn multisample_target(context: &GpuContext) -> Option<MultisampleTarget> {
        (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }

    fn encode_draw(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(view)),
            None => (view, None),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("background pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment_view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

impl FrameSink for GpuState {
    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(PhysicalSize::new(width, height));
        self.multisample_target = Self::multisample_target(&self.context);
    }

    fn draw(&mut self, uniforms: &UniformSet) -> Result<(), FrameError> {
        let acquire_start = Instant::now();
        let frame = self
            .context
            .surface
            .get_current_texture()
            .map_err(frame_error)?;
        let acquire = acquire_start.elapsed();
        if acquire > ACQUIRE_BUDGET {
            warn!(
                acquire_ms = acquire.as_millis(),
                "acquiring frame took longer than expected"
            );
        }

        let uniforms = BackgroundUniforms::from_set(uniforms);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        self.encode_draw(&mut encoder, &view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn frame_error(error: wgpu::SurfaceError) -> FrameError {
    match error {
        wgpu::SurfaceError::Lost => FrameError::Lost,
        wgpu::SurfaceError::Outdated => FrameError::Outdated,
        wgpu::SurfaceError::Timeout => FrameError::Timeout,
        wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
        other => FrameError::Other(format!("{other:?}")),
    }
}
