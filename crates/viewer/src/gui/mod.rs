use std::sync::mpsc::Sender;

use egui::Context;
use load::ArtifactPickerGui;
use perf::perf_info;
use playback::playback_controls;
use status::load_status;
use viewer_protocol::message::HostMessage;

use crate::{perf::PerformanceTracker, viewer::Viewer};

pub mod event;
pub mod load;
mod perf;
mod playback;
pub(crate) mod state;
mod status;

pub struct GuiParam<'a> {
    pub viewer: &'a Viewer,
    pub perf_tracker: &'a PerformanceTracker,
    pub picker: &'a dyn ArtifactPickerGui,
    pub commands: &'a Sender<HostMessage>,
}

/// Every overlay action goes through the same command queue as the host.
pub fn gui_main(ctx: &Context, param: GuiParam) {
    load_status(ctx, param.viewer.status());
    playback_controls(ctx, param.viewer.controller(), param.commands);
    param.picker.ui(ctx, param.commands);
    perf_info(ctx, param.perf_tracker);
}
