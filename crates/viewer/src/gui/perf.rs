use egui::{Align2, Context, Window};

use crate::perf::PerformanceTracker;

pub fn perf_info(ctx: &Context, perf_tracker: &PerformanceTracker) {
    Window::new("Performance")
        .resizable([false, false])
        .anchor(Align2::RIGHT_BOTTOM, [-8.0, -8.0])
        .show(ctx, |ui| {
            match perf_tracker.avg_frame_time() {
                Some(time) => ui.label(format!(
                    "Avg frame time: {:.2}ms",
                    time.as_secs_f64() * 1000.0
                )),
                None => ui.label("Avg frame time: unknown"),
            };
            match perf_tracker.fps() {
                Some(fps) => ui.label(format!("FPS: {:.1}", fps)),
                None => ui.label("FPS: unknown"),
            };
        });
}
