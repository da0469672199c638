use std::{
    fmt::{self, Display, Formatter},
    sync::{mpsc::Sender, Arc, Mutex, PoisonError},
};

use glam::Vec2;
use log::{error, info, warn};
use viewer_protocol::message::HostMessage;
use web_time::Instant;
use wgpu::{
    util::{backend_bits_from_env, initialize_adapter_from_env, power_preference_from_env},
    Adapter, Backends, CompositeAlphaMode, CreateSurfaceError, Device, DeviceDescriptor,
    Instance, InstanceDescriptor, Limits, PowerPreference, PresentMode, Queue,
    RequestAdapterOptions, RequestDeviceError, Surface, SurfaceConfiguration, SurfaceError,
    TextureFormat, TextureUsages, TextureViewDescriptor,
};

use crate::{
    gui::{event::GuiEventHandler, load::ArtifactPickerGui, state::EguiState},
    perf::PerformanceTracker,
    renderer::{OngoingRenderState, Renderer, WgpuRegionPass},
    viewer::Viewer,
    RenderTarget,
};

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderResult {
    Succeed,
    NoSurface,
    SurfaceLost,
    OutOfMemory,
}

#[derive(Debug)]
pub enum StateError {
    CreateSurface(CreateSurfaceError),
    NoAdapter,
    RequestDevice(RequestDeviceError),
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateError::CreateSurface(err) => write!(f, "Failed to create surface: {}", err),
            StateError::NoAdapter => write!(f, "Failed to acquire a graphic adapter"),
            StateError::RequestDevice(err) => write!(f, "Failed to acquire a device: {}", err),
        }
    }
}

impl std::error::Error for StateError {}

impl From<CreateSurfaceError> for StateError {
    fn from(err: CreateSurfaceError) -> Self {
        StateError::CreateSurface(err)
    }
}

impl From<RequestDeviceError> for StateError {
    fn from(err: RequestDeviceError) -> Self {
        StateError::RequestDevice(err)
    }
}

/// The GPU side of the viewer: surface, device, renderer and overlay around
/// one `Viewer`.
pub struct State<'a> {
    instance: Instance,
    adapter: Adapter,
    surface: Option<Surface<'a>>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    size: (u32, u32),

    perf_tracker: PerformanceTracker,
    last_render_time: Option<Instant>,

    renderer: Renderer,
    viewer: Viewer,
    commands: Sender<HostMessage>,
    gui_state: EguiState,
}

impl<'a> State<'a> {
    fn create_config(
        surface: &Surface,
        adapter: &Adapter,
        size: (u32, u32),
    ) -> SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(TextureFormat::Bgra8UnormSrgb);
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(CompositeAlphaMode::Auto),
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        }
    }

    pub async fn new(
        render_target: Arc<dyn RenderTarget>,
        size: (u32, u32),
        event_handler: Arc<Mutex<dyn GuiEventHandler>>,
        picker: Arc<dyn ArtifactPickerGui>,
        mut viewer: Viewer,
    ) -> Result<Self, StateError> {
        let backends = backend_bits_from_env().unwrap_or(Backends::all());
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface = instance.create_surface(render_target)?;
        let adapter = match initialize_adapter_from_env(&instance, Some(&surface)) {
            Some(adapter) => adapter,
            None => instance
                .request_adapter(&RequestAdapterOptions {
                    compatible_surface: Some(&surface),
                    power_preference: power_preference_from_env().unwrap_or(PowerPreference::None),
                    ..Default::default()
                })
                .await
                .ok_or(StateError::NoAdapter)?,
        };
        info!("Using adapter {:?}", adapter.get_info());
        let limits = Limits::default().using_resolution(adapter.limits());
        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Device"),
                    required_limits: limits,
                    ..Default::default()
                },
                None,
            )
            .await?;

        let config = Self::create_config(&surface, &adapter, size);
        surface.configure(&device, &config);

        viewer.resize(size);
        let renderer = Renderer::new(
            &device,
            config.format,
            size,
            viewer.viewports().camera(),
            viewer.config().background_color(),
        );
        let gui_state = EguiState::new(
            &device,
            config.format,
            event_handler,
            picker,
            viewer.config().overlay_visible,
        );
        let commands = viewer.command_sender();

        Ok(Self {
            instance,
            adapter,
            surface: Some(surface),
            device,
            queue,
            config,
            size,
            perf_tracker: PerformanceTracker::default(),
            last_render_time: None,
            renderer,
            viewer,
            commands,
            gui_state,
        })
    }

    pub fn resize(&mut self, new_size: (u32, u32)) {
        self.size = new_size;
        self.config.width = new_size.0;
        self.config.height = new_size.1;
        self.viewer.resize(new_size);
        if new_size.0 != 0 && new_size.1 != 0 {
            let Some(surface) = &self.surface else {
                return;
            };
            surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, new_size);
        }
    }

    pub fn recreate_surface(&mut self, render_target: Arc<dyn RenderTarget>) {
        if self.size.0 == 0 || self.size.1 == 0 {
            return;
        }
        let surface = match self.instance.create_surface(render_target) {
            Ok(surface) => surface,
            Err(err) => {
                error!("Failed to recreate surface: {}", err);
                return;
            }
        };
        self.config = Self::create_config(&surface, &self.adapter, self.size);
        surface.configure(&self.device, &self.config);
        self.surface = Some(surface);
    }

    pub fn destroy_surface(&mut self) {
        self.surface = None;
    }

    /// Drag in pixels, horizontal turns around the target.
    pub fn orbit_rotate(&mut self, delta: (f32, f32)) {
        self.viewer.orbit_mut().rotate(Vec2::new(delta.0, delta.1));
    }

    pub fn orbit_pan(&mut self, delta: (f32, f32)) {
        self.viewer.orbit_mut().pan(Vec2::new(delta.0, delta.1));
    }

    pub fn orbit_zoom(&mut self, steps: f32) {
        self.viewer.orbit_mut().zoom(steps);
    }

    pub fn toggle_playback(&mut self) {
        let command = if self.viewer.controller().is_playing() {
            HostMessage::Pause
        } else {
            HostMessage::Play
        };
        let _ = self.commands.send(command);
    }

    pub fn render(&mut self, render_target: &dyn RenderTarget) -> RenderResult {
        let Some(surface) = &self.surface else {
            return RenderResult::NoSurface;
        };

        let start_time = Instant::now();
        let delta_time = self
            .last_render_time
            .map(|last| (start_time - last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_render_time = Some(start_time);

        self.viewer.tick(delta_time);
        self.viewer.prepare(&self.device, &self.queue);
        self.renderer
            .prepare(&self.queue, self.viewer.viewports().camera());

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                warn!("Surface is lost or outdated, drop this frame.");
                return RenderResult::SurfaceLost;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("Out of memory when allocating a frame.");
                return RenderResult::OutOfMemory;
            }
            Err(SurfaceError::Timeout) => {
                warn!("Timed out when allocating a frame");
                render_target.request_redraw();
                return RenderResult::Succeed;
            }
        };
        let texture_view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let mut ongoing_state = OngoingRenderState::new(&self.device, &texture_view, &self.renderer);

        {
            let mut pass = WgpuRegionPass::new(&mut ongoing_state.render_pass, &self.renderer);
            self.viewer.render(&mut pass);
        }

        if self.gui_state.active {
            // The overlay spans the whole surface, not the last half drawn
            let (width, height) = self.size;
            ongoing_state
                .render_pass
                .set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            ongoing_state.render_pass.set_scissor_rect(0, 0, width, height);

            let full_output =
                self.gui_state
                    .run(&self.viewer, &self.perf_tracker, &self.commands);
            let mut event_handler = self
                .gui_state
                .event_handler
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let pixels_per_point = event_handler.egui_context().zoom_factor()
                * render_target.native_pixels_per_point();
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [width, height],
                pixels_per_point,
            };
            event_handler.handle_platform_output(full_output.platform_output);
            let paint_jobs = event_handler
                .egui_context()
                .tessellate(full_output.shapes, full_output.pixels_per_point);
            for (id, image_delta) in &full_output.textures_delta.set {
                self.gui_state
                    .renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }
            self.gui_state.renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut ongoing_state.encoder,
                &paint_jobs,
                &screen_descriptor,
            );
            self.gui_state.renderer.render(
                &mut ongoing_state.render_pass,
                &paint_jobs,
                &screen_descriptor,
            );
            for id in &full_output.textures_delta.free {
                self.gui_state.renderer.free_texture(id);
            }
        }
        ongoing_state.finish(&self.queue);

        render_target.pre_present_notify();
        output.present();
        render_target.request_redraw();

        let end_time = Instant::now();
        self.perf_tracker.add_sample(end_time - start_time, end_time);
        RenderResult::Succeed
    }

    pub fn egui_active(&self) -> bool {
        self.gui_state.active
    }

    pub fn set_egui_active(&mut self, active: bool) {
        self.gui_state.active = active;
    }
}
