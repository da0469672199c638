use glam::Vec3;
use log::trace;
use viewer_asset::bvh::SkeletalMotion;
use wgpu::{Device, Queue, RenderPass};

use crate::{
    playback::FrameCursor,
    renderer::{
        pipeline::Pipelines,
        vertex::{LineVertex, VertexBuffer},
    },
};

use super::Drawable;

/// Stick figure of a [`SkeletalMotion`]: one line segment per parent to child
/// bone, end sites included.
#[derive(Debug)]
pub struct SkeletonDrawable {
    motion: SkeletalMotion,
    segments: Vec<LineVertex>,
    frame_index: Option<usize>,
    dirty: bool,
    disposed: bool,
    gpu: Option<VertexBuffer>,
}

impl SkeletonDrawable {
    pub fn new(motion: SkeletalMotion, color: [f32; 4]) -> Self {
        let segments = vec![
            LineVertex {
                position: [0.0; 3],
                color,
            };
            motion.hierarchy.bone_count() * 2
        ];
        let mut drawable = Self {
            motion,
            segments,
            frame_index: None,
            dirty: true,
            disposed: false,
            gpu: None,
        };
        drawable.show_time(0.0);
        drawable
    }

    fn show_time(&mut self, time: f32) {
        let index = self.motion.clip.frame_index_at(time);
        if self.frame_index == Some(index) {
            return;
        }
        let pose = self.motion.pose_at(time);
        let positions = pose.world_positions(&self.motion.hierarchy);
        let bones = self
            .motion
            .hierarchy
            .joints()
            .iter()
            .enumerate()
            .filter_map(|(id, joint)| joint.parent().map(|parent| (parent, id)));
        for (segment, (parent, child)) in self.segments.chunks_exact_mut(2).zip(bones) {
            segment[0].position = positions[parent].to_array();
            segment[1].position = positions[child].to_array();
        }
        self.frame_index = Some(index);
        self.dirty = true;
        trace!("Skeleton drawable shows frame {}", index);
    }

    pub fn motion(&self) -> &SkeletalMotion {
        &self.motion
    }

    pub fn segments(&self) -> &[LineVertex] {
        &self.segments
    }

    pub fn frame_index(&self) -> Option<usize> {
        self.frame_index
    }
}

impl Drawable for SkeletonDrawable {
    fn update_for_frame(&mut self, cursor: &FrameCursor) {
        if self.disposed {
            return;
        }
        self.show_time(cursor.time());
    }

    fn object_count(&self) -> usize {
        if self.disposed {
            0
        } else {
            self.segments.len() / 2
        }
    }

    fn dispose(&mut self) {
        if let Some(buffer) = self.gpu.take() {
            buffer.destroy();
        }
        self.segments = Vec::new();
        self.frame_index = None;
        self.disposed = true;
    }

    fn positions(&self) -> Vec<Vec3> {
        self.segments
            .iter()
            .map(|vertex| Vec3::from_array(vertex.position))
            .collect()
    }

    fn prepare(&mut self, device: &Device, queue: &Queue) {
        if self.disposed || self.segments.is_empty() {
            return;
        }
        match &self.gpu {
            Some(buffer) => {
                if self.dirty {
                    buffer.write(queue, &self.segments);
                }
            }
            None => {
                self.gpu = Some(VertexBuffer::new(
                    device,
                    &self.segments,
                    Some("Skeleton Segments"),
                ));
            }
        }
        self.dirty = false;
    }

    fn draw(&self, render_pass: &mut RenderPass<'_>, pipelines: &Pipelines) {
        let Some(buffer) = &self.gpu else {
            return;
        };
        render_pass.set_pipeline(pipelines.line());
        buffer.draw(render_pass);
    }
}
