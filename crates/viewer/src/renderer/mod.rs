use std::iter;

use glam::Vec3;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BufferBindingType, Color, CommandEncoder,
    CommandEncoderDescriptor, Device, LoadOp, Operations, Queue, RenderPass,
    RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor,
    ShaderStages, StoreOp, TextureFormat, TextureView,
};

use crate::{
    scene::Scene,
    viewport::{Region, RegionPass, ViewportSide},
};

use camera::Camera;
use depth_texture::DepthTexture;
use pipeline::Pipelines;
use uniform::CameraUniformBuffer;

pub mod camera;
mod depth_texture;
pub mod pipeline;
mod uniform;
pub mod vertex;

pub use depth_texture::DEPTH_TEXTURE_FORMAT;

pub struct OngoingRenderState {
    pub encoder: CommandEncoder,
    pub render_pass: RenderPass<'static>,
}

impl OngoingRenderState {
    pub fn new(device: &Device, texture_view: &TextureView, renderer: &Renderer) -> Self {
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        let background = renderer.background_color;
        let render_pass = encoder
            .begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: texture_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: background.x as f64,
                            g: background.y as f64,
                            b: background.z as f64,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: renderer.depth_texture.texture_view(),
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            })
            .forget_lifetime();
        Self {
            encoder,
            render_pass,
        }
    }

    pub fn finish(self, queue: &Queue) {
        drop(self.render_pass);
        queue.submit(iter::once(self.encoder.finish()));
    }
}

/// Draws scenes into regions of a live wgpu render pass.
pub struct WgpuRegionPass<'a> {
    render_pass: &'a mut RenderPass<'static>,
    renderer: &'a Renderer,
}

impl<'a> WgpuRegionPass<'a> {
    pub fn new(render_pass: &'a mut RenderPass<'static>, renderer: &'a Renderer) -> Self {
        Self {
            render_pass,
            renderer,
        }
    }
}

impl RegionPass for WgpuRegionPass<'_> {
    fn restrict(&mut self, region: Region) {
        self.render_pass.set_viewport(
            region.x as f32,
            region.y as f32,
            region.width as f32,
            region.height as f32,
            0.0,
            1.0,
        );
        self.render_pass
            .set_scissor_rect(region.x, region.y, region.width, region.height);
    }

    fn draw_scene(&mut self, _side: ViewportSide, scene: &Scene) {
        self.render_pass
            .set_bind_group(0, &self.renderer.camera_bind_group, &[]);
        scene.draw(&mut *self.render_pass, &self.renderer.pipelines);
    }
}

pub struct Renderer {
    background_color: Vec3,
    depth_texture: DepthTexture,
    camera_uniform: CameraUniformBuffer,
    camera_bind_group: BindGroup,
    pipelines: Pipelines,
}

impl Renderer {
    fn create_camera_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Camera Bind Group Layout"),
        })
    }

    pub fn new(
        device: &Device,
        format: TextureFormat,
        size: (u32, u32),
        camera: &Camera,
        background_color: Vec3,
    ) -> Self {
        let camera_uniform = CameraUniformBuffer::new(device, camera);
        let camera_layout = Self::create_camera_layout(device);
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_uniform.buffer().as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });
        let pipelines = Pipelines::new(device, &camera_layout, format);

        Self {
            background_color,
            depth_texture: DepthTexture::new(device, size),
            camera_uniform,
            camera_bind_group,
            pipelines,
        }
    }

    pub fn resize(&mut self, device: &Device, size: (u32, u32)) {
        self.depth_texture = DepthTexture::new(device, size);
    }

    pub fn prepare(&mut self, queue: &Queue, camera: &Camera) {
        self.camera_uniform.update(queue, camera);
    }
}
