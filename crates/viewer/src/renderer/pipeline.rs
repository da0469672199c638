use wgpu::{
    include_wgsl, BindGroupLayout, BlendState, ColorTargetState, ColorWrites, CompareFunction,
    DepthBiasState, DepthStencilState, Device, FragmentState, FrontFace, MultisampleState,
    PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology, RenderPipeline,
    RenderPipelineDescriptor, ShaderModule, StencilState, TextureFormat, VertexBufferLayout,
    VertexState,
};

use super::{
    depth_texture::DEPTH_TEXTURE_FORMAT,
    vertex::{LineVertex, MeshVertex, Vertex},
};

#[derive(Debug)]
struct RenderPipelineDescriptorItem<'a> {
    label: &'a str,
    shader_module: &'a ShaderModule,
    target_texture_format: TextureFormat,
    primitive_topology: PrimitiveTopology,
    vertex_layout: VertexBufferLayout<'a>,
}

fn create_render_pipeline(
    device: &Device,
    camera_layout: &BindGroupLayout,
    descriptor: RenderPipelineDescriptorItem,
) -> RenderPipeline {
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(descriptor.label),
        bind_group_layouts: &[camera_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(descriptor.label),
        layout: Some(&layout),
        vertex: VertexState {
            module: descriptor.shader_module,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[descriptor.vertex_layout],
        },
        fragment: Some(FragmentState {
            module: descriptor.shader_module,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format: descriptor.target_texture_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::all(),
            })],
        }),
        primitive: PrimitiveState {
            topology: descriptor.primitive_topology,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // Capture meshes do not guarantee consistent winding
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_TEXTURE_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// The two pipelines the split view needs: shaded triangles for the mesh and
/// flat lines for the skeleton.
#[derive(Debug)]
pub struct Pipelines {
    mesh: RenderPipeline,
    line: RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &Device,
        camera_layout: &BindGroupLayout,
        target_texture_format: TextureFormat,
    ) -> Self {
        let mesh_shader = device.create_shader_module(include_wgsl!("../../shader/mesh.wgsl"));
        let line_shader = device.create_shader_module(include_wgsl!("../../shader/line.wgsl"));
        let mesh = create_render_pipeline(
            device,
            camera_layout,
            RenderPipelineDescriptorItem {
                label: "Mesh Pipeline",
                shader_module: &mesh_shader,
                target_texture_format,
                primitive_topology: PrimitiveTopology::TriangleList,
                vertex_layout: MeshVertex::desc(),
            },
        );
        let line = create_render_pipeline(
            device,
            camera_layout,
            RenderPipelineDescriptorItem {
                label: "Line Pipeline",
                shader_module: &line_shader,
                target_texture_format,
                primitive_topology: PrimitiveTopology::LineList,
                vertex_layout: LineVertex::desc(),
            },
        );
        Self { mesh, line }
    }

    pub fn mesh(&self) -> &RenderPipeline {
        &self.mesh
    }

    pub fn line(&self) -> &RenderPipeline {
        &self.line
    }
}
