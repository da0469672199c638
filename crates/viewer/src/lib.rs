pub mod channel;
pub mod config;
pub mod fetch;
pub mod gui;
pub mod perf;
pub mod playback;
pub mod renderer;
pub mod scene;
pub mod state;
pub mod viewer;
pub mod viewport;

#[cfg(feature = "winit")]
pub mod winit;

pub use egui;
pub use viewer_asset;
pub use viewer_protocol;

use wgpu::{
    rwh::{HasDisplayHandle, HasWindowHandle},
    WasmNotSendSync,
};

pub trait RenderTarget: HasWindowHandle + HasDisplayHandle + WasmNotSendSync + 'static {
    fn native_pixels_per_point(&self) -> f32;
    fn pre_present_notify(&self);
    fn request_redraw(&self);
}
