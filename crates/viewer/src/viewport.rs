use crate::{
    playback::FrameCursor,
    renderer::camera::Camera,
    scene::Scene,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportSide {
    /// Scene A, the deforming mesh.
    Left,
    /// Scene B, the skeleton.
    Right,
}

/// One render pass over the shared surface, able to confine drawing to a region.
pub trait RegionPass {
    /// Restricts both the viewport and the scissor rectangle to `region`.
    fn restrict(&mut self, region: Region);
    fn draw_scene(&mut self, side: ViewportSide, scene: &Scene);
}

/// Two scenes sharing one camera, each drawn into its half of the surface.
#[derive(Debug)]
pub struct ViewportPair {
    camera: Camera,
    mesh_scene: Scene,
    skeleton_scene: Scene,
    size: (u32, u32),
}

impl ViewportPair {
    pub fn new(camera: Camera, size: (u32, u32)) -> Self {
        let mut pair = Self {
            camera,
            mesh_scene: Scene::default(),
            skeleton_scene: Scene::default(),
            size: (0, 0),
        };
        pair.resize(size);
        pair
    }

    /// Aspect ratio of one half: `(width / 2) / height`.
    pub fn half_aspect(size: (u32, u32)) -> f32 {
        let (left, _) = Self::split(size);
        if left.height == 0 || left.width == 0 {
            1.0
        } else {
            left.width as f32 / left.height as f32
        }
    }

    fn split(size: (u32, u32)) -> (Region, Region) {
        let (width, height) = size;
        let left_width = width / 2;
        (
            Region {
                x: 0,
                y: 0,
                width: left_width,
                height,
            },
            Region {
                x: left_width,
                y: 0,
                width: width - left_width,
                height,
            },
        )
    }

    pub fn resize(&mut self, size: (u32, u32)) {
        self.size = size;
        self.camera.set_aspect(Self::half_aspect(size));
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn regions(&self) -> (Region, Region) {
        Self::split(self.size)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn mesh_scene(&self) -> &Scene {
        &self.mesh_scene
    }

    pub fn mesh_scene_mut(&mut self) -> &mut Scene {
        &mut self.mesh_scene
    }

    pub fn skeleton_scene(&self) -> &Scene {
        &self.skeleton_scene
    }

    pub fn skeleton_scene_mut(&mut self) -> &mut Scene {
        &mut self.skeleton_scene
    }

    /// Disposes the content of both scenes. The camera is kept.
    pub fn clear(&mut self) {
        self.mesh_scene.clear();
        self.skeleton_scene.clear();
    }

    pub fn update_for_frame(&mut self, cursor: &FrameCursor) {
        self.mesh_scene.update_for_frame(cursor);
        self.skeleton_scene.update_for_frame(cursor);
    }

    /// Left half first, then the right half.
    pub fn render(&self, pass: &mut impl RegionPass) {
        let (left, right) = self.regions();
        if left.width > 0 && left.height > 0 {
            pass.restrict(left);
            pass.draw_scene(ViewportSide::Left, &self.mesh_scene);
        }
        if right.width > 0 && right.height > 0 {
            pass.restrict(right);
            pass.draw_scene(ViewportSide::Right, &self.skeleton_scene);
        }
    }
}
