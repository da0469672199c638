use glam::Vec3;
use log::trace;
use viewer_asset::mesh::MeshAnimationStream;
use wgpu::{Device, Queue, RenderPass};

use crate::{
    playback::{source_frame_index, FrameCursor},
    renderer::{
        pipeline::Pipelines,
        vertex::{IndexBuffer, MeshVertex, VertexBuffer},
    },
};

use super::Drawable;

/// Area-weighted vertex normals. Face indices are trusted to be in range.
pub fn compute_normals(vertices: &mut [MeshVertex], faces: &[u32]) {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for face in faces.chunks_exact(3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        let pa = Vec3::from_array(vertices[a].position);
        let pb = Vec3::from_array(vertices[b].position);
        let pc = Vec3::from_array(vertices[c].position);
        // Unnormalized cross product is proportional to the triangle area
        let normal = (pb - pa).cross(pc - pa);
        normals[a] += normal;
        normals[b] += normal;
        normals[c] += normal;
    }
    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}

#[derive(Debug)]
struct MeshGpu {
    vertices: VertexBuffer,
    indices: IndexBuffer,
}

/// Deforming surface driven by a [`MeshAnimationStream`]. Topology is fixed,
/// each frame only overwrites positions and normals.
#[derive(Debug)]
pub struct MeshDrawable {
    stream: MeshAnimationStream,
    vertices: Vec<MeshVertex>,
    frame_index: Option<usize>,
    dirty: bool,
    disposed: bool,
    gpu: Option<MeshGpu>,
}

impl MeshDrawable {
    pub fn new(stream: MeshAnimationStream, color: [f32; 4]) -> Self {
        let vertices = vec![
            MeshVertex {
                position: [0.0; 3],
                normal: [0.0; 3],
                color,
            };
            stream.vertex_count() as usize
        ];
        let mut drawable = Self {
            stream,
            vertices,
            frame_index: None,
            dirty: true,
            disposed: false,
            gpu: None,
        };
        drawable.show_frame(0);
        drawable
    }

    fn show_frame(&mut self, index: usize) {
        if self.frame_index == Some(index) || self.stream.frame_count() == 0 {
            return;
        }
        let positions = self.stream.frame(index as i64);
        for (vertex, position) in self.vertices.iter_mut().zip(positions.chunks_exact(3)) {
            vertex.position = [position[0], position[1], position[2]];
        }
        compute_normals(&mut self.vertices, self.stream.faces());
        self.frame_index = Some(index);
        self.dirty = true;
        trace!("Mesh drawable shows frame {}", index);
    }

    pub fn stream(&self) -> &MeshAnimationStream {
        &self.stream
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn frame_index(&self) -> Option<usize> {
        self.frame_index
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drawable for MeshDrawable {
    fn update_for_frame(&mut self, cursor: &FrameCursor) {
        if self.disposed {
            return;
        }
        let index = source_frame_index(cursor.current_frame, self.stream.frame_count() as usize);
        self.show_frame(index);
    }

    fn object_count(&self) -> usize {
        if self.disposed {
            0
        } else {
            1
        }
    }

    fn dispose(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.vertices.destroy();
            gpu.indices.destroy();
        }
        self.vertices = Vec::new();
        self.frame_index = None;
        self.disposed = true;
    }

    fn positions(&self) -> Vec<Vec3> {
        self.vertices
            .iter()
            .map(|vertex| Vec3::from_array(vertex.position))
            .collect()
    }

    fn prepare(&mut self, device: &Device, queue: &Queue) {
        if self.disposed || self.vertices.is_empty() || self.stream.faces().is_empty() {
            return;
        }
        match &self.gpu {
            Some(gpu) => {
                if self.dirty {
                    gpu.vertices.write(queue, &self.vertices);
                }
            }
            None => {
                self.gpu = Some(MeshGpu {
                    vertices: VertexBuffer::new(device, &self.vertices, Some("Mesh Vertices")),
                    indices: IndexBuffer::new(device, self.stream.faces(), Some("Mesh Indices")),
                });
            }
        }
        self.dirty = false;
    }

    fn draw(&self, render_pass: &mut RenderPass<'_>, pipelines: &Pipelines) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        render_pass.set_pipeline(pipelines.mesh());
        gpu.vertices.draw_with_indexes(&gpu.indices, render_pass);
    }
}
