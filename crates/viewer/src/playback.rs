use std::mem;

use log::{debug, warn};
use viewer_asset::{bvh::SkeletalMotion, mesh::MeshAnimationStream};
use viewer_protocol::message::ViewerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Playing,
    Paused,
    FrameChanged { frame: f32, total_frames: u32 },
    Looped,
}

impl From<PlaybackEvent> for ViewerEvent {
    fn from(event: PlaybackEvent) -> Self {
        match event {
            PlaybackEvent::Playing => ViewerEvent::Playing,
            PlaybackEvent::Paused => ViewerEvent::Paused,
            PlaybackEvent::FrameChanged {
                frame,
                total_frames,
            } => ViewerEvent::FrameChanged {
                frame,
                total_frames,
            },
            PlaybackEvent::Looped => ViewerEvent::Looped,
        }
    }
}

/// What a drawable needs to know about the clock for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCursor {
    pub current_frame: f32,
    pub total_frames: u32,
    pub fps: f32,
}

impl FrameCursor {
    /// Seconds since the start of the clip.
    pub fn time(&self) -> f32 {
        if self.fps > 0.0 {
            self.current_frame / self.fps
        } else {
            0.0
        }
    }
}

/// Maps the shared clock onto a source with `native_frames` frames. Sources
/// shorter than the combined length hold their last frame.
pub fn source_frame_index(current_frame: f32, native_frames: usize) -> usize {
    if native_frames == 0 || !(current_frame > 0.0) {
        return 0;
    }
    (current_frame.floor() as usize).min(native_frames - 1)
}

/// The single clock both representations follow.
#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    current_frame: f32,
    total_frames: u32,
    fps: f32,
    default_fps: f32,
    speed: f32,
    events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(default_fps: f32) -> Self {
        let default_fps = if default_fps.is_finite() && default_fps > 0.0 {
            default_fps
        } else {
            30.0
        };
        Self {
            state: PlaybackState::Paused,
            current_frame: 0.0,
            total_frames: 0,
            fps: default_fps,
            default_fps,
            speed: 1.0,
            events: Vec::new(),
        }
    }

    /// Resets to frame 0, paused, with the length of the longer source. The
    /// rate comes from the mesh, then the clip, then the configured default.
    pub fn load(&mut self, mesh: Option<&MeshAnimationStream>, motion: Option<&SkeletalMotion>) {
        let mesh_frames = mesh.map(|mesh| mesh.frame_count()).unwrap_or(0);
        let clip_frames = motion
            .map(|motion| motion.clip.frame_count() as u32)
            .unwrap_or(0);
        self.total_frames = mesh_frames.max(clip_frames);
        self.fps = mesh
            .map(|mesh| mesh.fps())
            .or_else(|| {
                motion
                    .filter(|motion| motion.clip.frame_time() > 0.0)
                    .map(|motion| motion.clip.fps() as f32)
            })
            .unwrap_or(self.default_fps);
        self.current_frame = 0.0;
        self.state = PlaybackState::Paused;
        debug!(
            "Playback loaded: {} frames at {} fps",
            self.total_frames, self.fps
        );
    }

    /// Forgets the current dataset. Emits `Paused` if playback was running.
    pub fn unload(&mut self) {
        self.pause();
        self.total_frames = 0;
        self.current_frame = 0.0;
        self.fps = self.default_fps;
    }

    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        if self.total_frames == 0 {
            warn!("Ignoring play request: nothing is loaded");
            return;
        }
        self.state = PlaybackState::Playing;
        self.events.push(PlaybackEvent::Playing);
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Paused {
            return;
        }
        self.state = PlaybackState::Paused;
        self.events.push(PlaybackEvent::Paused);
    }

    pub fn seek(&mut self, frame: f32) {
        let last = self.total_frames.saturating_sub(1) as f32;
        self.current_frame = if frame.is_nan() {
            0.0
        } else {
            frame.clamp(0.0, last)
        };
        self.push_frame_changed();
    }

    pub fn tick(&mut self, delta_time: f32) {
        if self.state != PlaybackState::Playing || self.total_frames == 0 {
            return;
        }
        self.current_frame += delta_time * self.fps * self.speed;
        if self.current_frame >= self.total_frames as f32 {
            self.current_frame = 0.0;
            self.events.push(PlaybackEvent::Looped);
        } else {
            self.push_frame_changed();
        }
    }

    pub fn set_speed(&mut self, speed: f32) {
        if !speed.is_finite() || speed < 0.0 {
            warn!("Ignoring invalid playback speed {}", speed);
            return;
        }
        self.speed = speed;
    }

    fn push_frame_changed(&mut self) {
        self.events.push(PlaybackEvent::FrameChanged {
            frame: self.current_frame,
            total_frames: self.total_frames,
        });
    }

    pub fn take_events(&mut self) -> Vec<PlaybackEvent> {
        mem::take(&mut self.events)
    }

    pub fn cursor(&self) -> FrameCursor {
        FrameCursor {
            current_frame: self.current_frame,
            total_frames: self.total_frames,
            fps: self.fps,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}
