use std::sync::mpsc::Sender;

use egui::{Align2, Button, Context, Slider, Window};
use viewer_protocol::message::HostMessage;

use crate::playback::PlaybackController;

pub fn playback_controls(
    ctx: &Context,
    controller: &PlaybackController,
    commands: &Sender<HostMessage>,
) {
    let loaded = controller.total_frames() > 0;
    Window::new("Playback")
        .resizable([false, false])
        .anchor(Align2::CENTER_BOTTOM, [0.0, -8.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (label, command) = if controller.is_playing() {
                    ("Pause", HostMessage::Pause)
                } else {
                    ("Play", HostMessage::Play)
                };
                if ui.add_enabled(loaded, Button::new(label)).clicked() {
                    let _ = commands.send(command);
                }
                ui.label(format!(
                    "Frame {} / {} @ {} fps",
                    controller.current_frame().floor() as u32,
                    controller.total_frames(),
                    controller.fps()
                ));
            });

            let mut frame = controller.current_frame().floor();
            let last = controller.total_frames().saturating_sub(1) as f32;
            let seek = ui.add_enabled(
                loaded,
                Slider::new(&mut frame, 0.0..=last).step_by(1.0).text("Frame"),
            );
            if seek.changed() {
                let _ = commands.send(HostMessage::Seek { frame });
            }

            let mut speed = controller.speed();
            let speed_slider = ui.add(
                Slider::new(&mut speed, 0.1..=4.0)
                    .logarithmic(true)
                    .text("Speed"),
            );
            if speed_slider.changed() {
                let _ = commands.send(HostMessage::SetSpeed { value: speed });
            }
        });
}
