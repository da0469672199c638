use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::{self, Receiver, Sender},
};

use log::{debug, info};
use viewer_asset::{bvh::ParseError, mesh::MeshFormatError};
use viewer_protocol::message::{HostMessage, ViewerEvent};

use crate::fetch::FetchError;

/// Everything that can go wrong between `LoadData` and a ready scene. The
/// display text is the status line shown to the user.
#[derive(Debug)]
pub enum LoadError {
    Format(MeshFormatError),
    Parse(ParseError),
    Fetch(FetchError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Format(err) => write!(f, "Invalid mesh artifact: {}", err),
            LoadError::Parse(err) => write!(f, "Invalid skeletal motion: {}", err),
            LoadError::Fetch(err) => write!(f, "Failed to fetch mesh artifact: {}", err),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Format(err) => Some(err),
            LoadError::Parse(err) => Some(err),
            LoadError::Fetch(err) => Some(err),
        }
    }
}

impl From<MeshFormatError> for LoadError {
    fn from(err: MeshFormatError) -> Self {
        LoadError::Format(err)
    }
}

impl From<ParseError> for LoadError {
    fn from(err: ParseError) -> Self {
        LoadError::Parse(err)
    }
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        LoadError::Fetch(err)
    }
}

/// The host's side of the channel.
pub struct HostEndpoint {
    pub commands: Sender<HostMessage>,
    pub events: Receiver<ViewerEvent>,
}

/// The viewer's side: a command queue drained once per tick and an event
/// outlet. Delivery is at most once; nothing is acknowledged.
pub struct ControlChannel {
    commands_tx: Sender<HostMessage>,
    commands_rx: Receiver<HostMessage>,
    events_tx: Sender<ViewerEvent>,
}

impl ControlChannel {
    pub fn new() -> (Self, HostEndpoint) {
        let (commands_tx, commands_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();
        (
            Self {
                commands_tx: commands_tx.clone(),
                commands_rx,
                events_tx,
            },
            HostEndpoint {
                commands: commands_tx,
                events: events_rx,
            },
        )
    }

    /// Another producer for the command queue, used by the overlay.
    pub fn sender(&self) -> Sender<HostMessage> {
        self.commands_tx.clone()
    }

    pub fn drain(&self) -> Vec<HostMessage> {
        let commands: Vec<HostMessage> = self.commands_rx.try_iter().collect();
        for command in &commands {
            match command {
                HostMessage::LoadData {
                    mesh_artifact_ref, ..
                } => info!("Received LoadData for {}", mesh_artifact_ref),
                other => debug!("Received {:?}", other),
            }
        }
        commands
    }

    pub fn emit(&self, event: ViewerEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("Host endpoint dropped, event discarded");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_commands_are_drained_in_order() {
        let (channel, host) = ControlChannel::new();
        host.commands.send(HostMessage::Play).unwrap();
        channel.sender().send(HostMessage::Pause).unwrap();
        assert_eq!(
            channel.drain(),
            vec![HostMessage::Play, HostMessage::Pause]
        );
        assert!(channel.drain().is_empty());
    }

    #[test]
    fn test_emit_without_host() {
        let (channel, host) = ControlChannel::new();
        channel.emit(ViewerEvent::Looped);
        assert_eq!(host.events.try_recv().unwrap(), ViewerEvent::Looped);
        drop(host);
        channel.emit(ViewerEvent::Paused);
    }

    #[test]
    fn test_load_error_status_text() {
        let error = LoadError::from(ParseError::ValueCountMismatch {
            expected: 60,
            actual: 55,
        });
        assert_eq!(
            error.to_string(),
            "Invalid skeletal motion: Motion block has 55 values, expected 60"
        );
    }
}
