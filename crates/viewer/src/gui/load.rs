use std::sync::mpsc::Sender;

use egui::{Align2, Context, Window};
use viewer_protocol::message::HostMessage;

/// Platform hook for choosing a mesh artifact and motion file from the overlay.
/// Implementations send a `LoadData` into `commands`.
pub trait ArtifactPickerGui: Send + Sync {
    fn ui(&self, ctx: &Context, commands: &Sender<HostMessage>);
}

#[derive(Default)]
pub struct NotSupportedArtifactPickerGui {}

impl ArtifactPickerGui for NotSupportedArtifactPickerGui {
    fn ui(&self, ctx: &Context, _commands: &Sender<HostMessage>) {
        Window::new("Load")
            .resizable([false, false])
            .pivot(Align2::RIGHT_TOP)
            .show(ctx, |ui| {
                ui.label("Loading from the overlay is not supported here.");
            });
    }
}
