use std::{sync::mpsc::Sender, thread};

use log::warn;
use rfd::FileDialog;
use viewer::{
    egui::{Align2, Context, Window},
    gui::load::ArtifactPickerGui,
    viewer_protocol::message::HostMessage,
};

use crate::host::load_message;

#[derive(Default)]
pub struct DesktopArtifactPickerGui {}

impl ArtifactPickerGui for DesktopArtifactPickerGui {
    fn ui(&self, ctx: &Context, commands: &Sender<HostMessage>) {
        Window::new("Load")
            .resizable([false, false])
            .anchor(Align2::RIGHT_TOP, [-8.0, 8.0])
            .show(ctx, |ui| {
                if ui.button("Load mesh and motion").clicked() {
                    let tx = commands.clone();
                    thread::spawn(move || {
                        let Some(mesh) = FileDialog::new()
                            .set_title("Mesh animation stream")
                            .add_filter("Mesh animation stream", &["bin", "vanm"])
                            .pick_file()
                        else {
                            return;
                        };
                        let Some(motion) = FileDialog::new()
                            .set_title("Skeletal motion")
                            .add_filter("BVH motion capture", &["bvh"])
                            .pick_file()
                        else {
                            return;
                        };
                        match load_message(&mesh, &motion) {
                            Ok(message) => {
                                let _ = tx.send(message);
                            }
                            Err(err) => warn!("Cannot read \"{}\": {}", motion.display(), err),
                        }
                    });
                }
            });
    }
}
