use std::sync::{mpsc::Sender, Arc, Mutex, PoisonError};

use egui::FullOutput;
use egui_wgpu::Renderer as EguiRenderer;
use viewer_protocol::message::HostMessage;
use wgpu::{Device, TextureFormat};

use crate::{perf::PerformanceTracker, renderer::DEPTH_TEXTURE_FORMAT, viewer::Viewer};

use super::{event::GuiEventHandler, gui_main, load::ArtifactPickerGui, GuiParam};

pub(crate) struct EguiState {
    pub renderer: EguiRenderer,
    pub event_handler: Arc<Mutex<dyn GuiEventHandler>>,
    pub picker: Arc<dyn ArtifactPickerGui>,
    pub active: bool,
}

impl EguiState {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        event_handler: Arc<Mutex<dyn GuiEventHandler>>,
        picker: Arc<dyn ArtifactPickerGui>,
        active: bool,
    ) -> Self {
        let renderer = EguiRenderer::new(device, format, Some(DEPTH_TEXTURE_FORMAT), 1, false);
        Self {
            renderer,
            event_handler,
            picker,
            active,
        }
    }

    pub fn run(
        &mut self,
        viewer: &Viewer,
        perf_tracker: &PerformanceTracker,
        commands: &Sender<HostMessage>,
    ) -> FullOutput {
        let mut event_handler = self
            .event_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let input = event_handler.take_egui_input();
        let picker = self.picker.as_ref();
        event_handler.egui_context().run(input, |ctx| {
            gui_main(
                ctx,
                GuiParam {
                    viewer,
                    perf_tracker,
                    picker,
                    commands,
                },
            );
        })
    }
}
