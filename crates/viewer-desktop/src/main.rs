use std::{env, path::PathBuf, process::ExitCode, sync::Arc};

use log::error;
use viewer::{
    channel::ControlChannel,
    config::ViewerConfig,
    fetch::ArtifactResolver,
    gui::load::ArtifactPickerGui,
    winit::{App, AppParam},
};

mod host;
#[cfg(feature = "gui")]
mod picker;

fn picker() -> Arc<dyn ArtifactPickerGui> {
    #[cfg(feature = "gui")]
    {
        Arc::new(picker::DesktopArtifactPickerGui::default())
    }
    #[cfg(not(feature = "gui"))]
    {
        Arc::new(viewer::gui::load::NotSupportedArtifactPickerGui::default())
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let config = ViewerConfig::from_env();
    let (channel, host) = ControlChannel::new();

    // viewer-desktop [<mesh artifact> <motion.bvh>]
    let args: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    if let [mesh, motion] = &args[..] {
        match host::load_message(mesh, motion) {
            Ok(message) => {
                let _ = host.commands.send(message);
            }
            Err(err) => {
                error!("Cannot read \"{}\": {}", motion.display(), err);
                return ExitCode::FAILURE;
            }
        }
    } else if !args.is_empty() {
        error!("Usage: viewer-desktop [<mesh artifact> <motion.bvh>]");
        return ExitCode::FAILURE;
    }

    host::spawn_stdin_commands(host.commands.clone());
    host::spawn_stdout_events(host.events);

    let param = AppParam {
        fetcher: Box::new(ArtifactResolver::from_config(&config)),
        config,
        channel,
        picker: picker(),
    };
    match App::run(param) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Event loop failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
