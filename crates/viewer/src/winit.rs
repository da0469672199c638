#![cfg(not(target_family = "wasm"))]
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error};
use wgpu::rwh::{DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    error::EventLoopError,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

pub use winit;

use crate::{
    channel::ControlChannel,
    config::ViewerConfig,
    fetch::ArtifactFetcher,
    gui::{event::GuiEventHandler, load::ArtifactPickerGui},
    state::{RenderResult, State},
    viewer::Viewer,
    RenderTarget,
};

const INITIAL_SIZE: (u32, u32) = (1280, 720);
const PIXELS_PER_LINE: f32 = 40.0;

struct WindowRenderTarget {
    window: Arc<Window>,
}

impl HasWindowHandle for WindowRenderTarget {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for WindowRenderTarget {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

impl RenderTarget for WindowRenderTarget {
    fn native_pixels_per_point(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn pre_present_notify(&self) {
        self.window.pre_present_notify();
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

struct WindowEventHandler {
    window: Arc<Window>,
    egui_state: egui_winit::State,
}

impl WindowEventHandler {
    fn new(window: Arc<Window>) -> Self {
        use egui::{Context, ViewportId};

        let egui_state = egui_winit::State::new(
            Context::default(),
            ViewportId::default(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { window, egui_state }
    }
}

impl GuiEventHandler for WindowEventHandler {
    fn egui_context(&self) -> &egui::Context {
        self.egui_state.egui_ctx()
    }

    fn take_egui_input(&mut self) -> egui::RawInput {
        self.egui_state.take_egui_input(&self.window)
    }

    fn handle_platform_output(&mut self, platform_output: egui::PlatformOutput) {
        self.egui_state
            .handle_platform_output(&self.window, platform_output)
    }
}

/// What the desktop shell hands to the window loop.
pub struct AppParam {
    pub config: ViewerConfig,
    pub channel: ControlChannel,
    pub fetcher: Box<dyn ArtifactFetcher>,
    pub picker: Arc<dyn ArtifactPickerGui>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

#[derive(Debug, Default)]
struct PointerState {
    position: Option<PhysicalPosition<f64>>,
    left: bool,
    right: bool,
    modifiers: ModifiersState,
}

impl PointerState {
    /// Presses the overlay consumed are ignored, releases always count.
    fn set_button(&mut self, button: MouseButton, pressed: bool, consumed: bool) {
        if pressed && consumed {
            return;
        }
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Right => self.right = pressed,
            _ => (),
        }
    }

    fn drag(&self) -> Option<Drag> {
        if self.right || (self.left && self.modifiers.shift_key()) {
            Some(Drag::Pan)
        } else if self.left {
            Some(Drag::Rotate)
        } else {
            None
        }
    }
}

pub struct App {
    viewer: Option<Viewer>,
    state: Option<State<'static>>,
    render_target: Option<Arc<WindowRenderTarget>>,
    window_size: Option<PhysicalSize<u32>>,
    event_handler: Option<Arc<Mutex<WindowEventHandler>>>,
    picker: Arc<dyn ArtifactPickerGui>,
    pointer: PointerState,
}

impl App {
    pub fn run(param: AppParam) -> Result<(), EventLoopError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let viewer = Viewer::new(param.config, param.channel, param.fetcher, INITIAL_SIZE);
        let mut app = Self {
            viewer: Some(viewer),
            state: None,
            render_target: None,
            window_size: None,
            event_handler: None,
            picker: param.picker,
            pointer: PointerState::default(),
        };
        event_loop.run_app(&mut app)
    }

    fn create_state(&mut self, event_loop: &ActiveEventLoop) {
        debug!("Create state requested");
        let Some(render_target) = &self.render_target else {
            debug!("Window is none, don't create state");
            return;
        };
        let Some(size) = self.window_size else {
            debug!("Window size is none, don't create state");
            return;
        };
        if size.width == 0 || size.height == 0 {
            debug!("Size is zero, don't create state");
            return;
        }
        let Some(viewer) = self.viewer.take() else {
            return;
        };

        use pollster::FutureExt;

        let event_handler = Arc::new(Mutex::new(WindowEventHandler::new(
            render_target.window.clone(),
        )));
        self.event_handler = Some(event_handler.clone());

        let state = State::new(
            render_target.clone(),
            (size.width, size.height),
            event_handler,
            self.picker.clone(),
            viewer,
        )
        .block_on();
        match state {
            Ok(state) => {
                render_target.request_redraw();
                self.state = Some(state);
            }
            Err(err) => {
                error!("{}", err);
                event_loop.exit();
            }
        }
    }

    fn handle_pointer_motion(&mut self, position: PhysicalPosition<f64>) {
        let last = self.pointer.position.replace(position);
        let (Some(state), Some(last)) = (&mut self.state, last) else {
            return;
        };
        let delta = ((position.x - last.x) as f32, (position.y - last.y) as f32);
        match self.pointer.drag() {
            Some(Drag::Pan) => state.orbit_pan(delta),
            Some(Drag::Rotate) => state.orbit_rotate(delta),
            None => (),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        debug!("Resumed");
        if self.render_target.is_none() {
            let param = WindowAttributes::default()
                .with_title("Motion Viewer")
                .with_inner_size(PhysicalSize::new(INITIAL_SIZE.0, INITIAL_SIZE.1));
            let window = match event_loop.create_window(param) {
                Ok(window) => window,
                Err(err) => {
                    error!("Failed to create window: {}", err);
                    event_loop.exit();
                    return;
                }
            };
            debug!("Window created, reported size: {:?}", window.inner_size());
            self.window_size = Some(window.inner_size());
            self.render_target = Some(Arc::new(WindowRenderTarget {
                window: Arc::new(window),
            }));
        }
        if let (Some(state), Some(render_target)) = (&mut self.state, &self.render_target) {
            debug!("Recreating surface");
            state.recreate_surface(render_target.clone());
            return;
        }
        self.create_state(event_loop);
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        debug!("Suspended");
        if let Some(state) = &mut self.state {
            state.destroy_surface();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(render_target) = self.render_target.clone() else {
            debug!("Event received when window is none, event: {:?}", event);
            return;
        };
        if self.state.is_none() {
            if let WindowEvent::Resized(new_size) = event {
                self.window_size = Some(new_size);
                self.create_state(event_loop);
            }
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else { return };
                match state.render(render_target.as_ref()) {
                    RenderResult::Succeed => (),
                    RenderResult::NoSurface | RenderResult::SurfaceLost => {
                        state.recreate_surface(render_target.clone());
                        render_target.request_redraw();
                    }
                    RenderResult::OutOfMemory => event_loop.exit(),
                }
                return;
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    debug!("Resize to zero size: {:?}", new_size);
                    return;
                }
                self.window_size = Some(*new_size);
                if let Some(state) = &mut self.state {
                    state.resize((new_size.width, new_size.height));
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.pointer.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. }
                if !event.repeat && event.state == ElementState::Released =>
            {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        event_loop.exit();
                        return;
                    }
                    PhysicalKey::Code(KeyCode::F11) => {
                        let window = &render_target.window;
                        if window.fullscreen().is_some() {
                            window.set_fullscreen(None)
                        } else {
                            window.set_fullscreen(Some(Fullscreen::Borderless(None)))
                        }
                    }
                    PhysicalKey::Code(KeyCode::F10) => {
                        if let Some(state) = &mut self.state {
                            let active = !state.egui_active();
                            state.set_egui_active(active);
                        }
                        return;
                    }
                    _ => (),
                }
            }
            _ => (),
        }

        let egui_active = self.state.as_ref().is_some_and(State::egui_active);
        let consumed = match &self.event_handler {
            Some(event_handler) if egui_active => {
                let mut event_handler =
                    event_handler.lock().unwrap_or_else(PoisonError::into_inner);
                event_handler
                    .egui_state
                    .on_window_event(&render_target.window, &event)
                    .consumed
            }
            _ => false,
        };
        if let WindowEvent::MouseInput { state, button, .. } = &event {
            self.pointer.set_button(*button, state.is_pressed(), consumed);
        }
        if consumed {
            // Overlay took the pointer, restart any drag from scratch
            self.pointer.position = None;
            return;
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => self.handle_pointer_motion(position),
            WindowEvent::CursorLeft { .. } => self.pointer.position = None,
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y_delta) => y_delta,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                if let Some(state) = &mut self.state {
                    state.orbit_zoom(steps);
                }
            }
            WindowEvent::KeyboardInput { event, .. }
                if !event.repeat
                    && event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Space) =>
            {
                if let Some(state) = &mut self.state {
                    state.toggle_playback();
                }
            }
            _ => (),
        }
    }
}
