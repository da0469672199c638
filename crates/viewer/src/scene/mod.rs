use std::fmt::Debug;

use glam::Vec3;
use log::debug;
use wgpu::{Device, Queue, RenderPass};

use crate::{playback::FrameCursor, renderer::pipeline::Pipelines};

pub mod mesh;
pub mod skeleton;

pub use mesh::MeshDrawable;
pub use skeleton::SkeletonDrawable;

// A tick: update_for_frame -> prepare -> draw
// update_for_frame: pull the current frame from the source into CPU-side geometry
// prepare: create or overwrite GPU buffers
// draw: issue draw calls into the current region
pub trait Drawable: Debug {
    fn update_for_frame(&mut self, cursor: &FrameCursor);

    /// Number of scene objects this drawable contributes; zero once disposed.
    fn object_count(&self) -> usize;

    /// Releases CPU geometry and every GPU buffer. Safe to call twice.
    fn dispose(&mut self);

    /// Positions of the geometry as it would be drawn now.
    fn positions(&self) -> Vec<Vec3>;

    fn prepare(&mut self, _device: &Device, _queue: &Queue) {}

    fn draw(&self, _render_pass: &mut RenderPass<'_>, _pipelines: &Pipelines) {}
}

#[derive(Debug, Default)]
pub struct Scene {
    drawables: Vec<Box<dyn Drawable>>,
}

impl Scene {
    pub fn add(&mut self, drawable: Box<dyn Drawable>) {
        self.drawables.push(drawable);
    }

    /// Disposes and drops every drawable.
    pub fn clear(&mut self) {
        for drawable in &mut self.drawables {
            drawable.dispose();
        }
        if !self.drawables.is_empty() {
            debug!("Disposed {} drawables", self.drawables.len());
        }
        self.drawables.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn object_count(&self) -> usize {
        self.drawables
            .iter()
            .map(|drawable| drawable.object_count())
            .sum()
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.drawables
            .iter()
            .flat_map(|drawable| drawable.positions())
            .collect()
    }

    pub fn update_for_frame(&mut self, cursor: &FrameCursor) {
        for drawable in &mut self.drawables {
            drawable.update_for_frame(cursor);
        }
    }

    pub fn prepare(&mut self, device: &Device, queue: &Queue) {
        for drawable in &mut self.drawables {
            drawable.prepare(device, queue);
        }
    }

    pub fn draw(&self, render_pass: &mut RenderPass<'_>, pipelines: &Pipelines) {
        for drawable in &self.drawables {
            drawable.draw(render_pass, pipelines);
        }
    }
}
