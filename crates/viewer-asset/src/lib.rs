pub mod bvh;
pub mod mesh;
