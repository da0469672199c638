use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
    sync::mpsc::{Receiver, Sender},
    thread,
};

use log::{debug, info, warn};
use viewer::{
    fetch::FILE_SCHEME,
    viewer_protocol::message::{HostMessage, ViewerEvent},
};

/// Feeds newline-delimited JSON commands from stdin into the viewer.
pub fn spawn_stdin_commands(commands: Sender<HostMessage>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("Failed to read stdin: {}", err);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match HostMessage::from_json(&line) {
                Ok(message) => {
                    if commands.send(message).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("Ignoring malformed command {:?}: {}", line, err),
            }
        }
        debug!("Stdin closed");
    });
}

/// Writes every viewer event to stdout, one JSON document per line.
pub fn spawn_stdout_events(events: Receiver<ViewerEvent>) {
    thread::spawn(move || {
        let stdout = io::stdout();
        for event in events.iter() {
            let line = match event.to_json() {
                Ok(line) => line,
                Err(err) => {
                    warn!("Failed to serialize {:?}: {}", event, err);
                    continue;
                }
            };
            let mut stdout = stdout.lock();
            if writeln!(stdout, "{}", line).and_then(|_| stdout.flush()).is_err() {
                break;
            }
        }
    });
}

pub fn load_message(mesh_path: &Path, motion_path: &Path) -> io::Result<HostMessage> {
    let skeleton_motion_text = fs::read_to_string(motion_path)?;
    info!(
        "Loading {} with motion {}",
        mesh_path.display(),
        motion_path.display()
    );
    Ok(HostMessage::LoadData {
        mesh_artifact_ref: format!("{}{}", FILE_SCHEME, mesh_path.display()),
        skeleton_motion_text,
    })
}
