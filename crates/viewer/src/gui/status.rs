use egui::{Align2, Color32, Context, Window};

use crate::viewer::LoadStatus;

/// Loading indicator, load summary or the error that replaced them.
pub fn load_status(ctx: &Context, status: &LoadStatus) {
    Window::new("Status")
        .resizable([false, false])
        .anchor(Align2::LEFT_TOP, [8.0, 8.0])
        .show(ctx, |ui| match status {
            LoadStatus::Idle => {
                ui.label("Waiting for data");
            }
            LoadStatus::Loading { artifact_ref } => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Loading {}", artifact_ref));
                });
            }
            LoadStatus::Loaded { summary } => {
                ui.label(summary);
            }
            LoadStatus::Failed { message } => {
                ui.colored_label(Color32::LIGHT_RED, message);
            }
        });
}
