use serde::{Deserialize, Serialize};

use crate::version::VersionData;

/// Commands sent by the embedding host. Binary artifacts are never inlined,
/// the mesh travels as a reference resolved by the viewer's fetcher.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HostMessage {
    LoadData {
        mesh_artifact_ref: String,
        skeleton_motion_text: String,
    },
    Play,
    Pause,
    Seek {
        frame: f32,
    },
    SetSpeed {
        value: f32,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ViewerEvent {
    Ready {
        version: VersionData,
    },
    Loading {
        mesh_artifact_ref: String,
    },
    Loaded {
        mesh_frames: u32,
        skeleton_frames: u32,
        total_frames: u32,
        fps: f32,
    },
    LoadFailed {
        message: String,
    },
    Playing,
    Paused,
    FrameChanged {
        frame: f32,
        total_frames: u32,
    },
    Looped,
}

impl HostMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ViewerEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
