use std::sync::mpsc::{self, Receiver, Sender};

use log::{error, info, warn};
use viewer_asset::{bvh::SkeletalMotion, mesh::MeshAnimationStream};
use viewer_protocol::{
    message::{HostMessage, ViewerEvent},
    version::VersionData,
};
use wgpu::{Device, Queue};

use crate::{
    channel::{ControlChannel, LoadError},
    config::ViewerConfig,
    fetch::{ArtifactFetcher, FetchError},
    playback::PlaybackController,
    renderer::camera::{Camera, OrbitController},
    scene::{MeshDrawable, SkeletonDrawable},
    viewport::{RegionPass, ViewportPair},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading {
        artifact_ref: String,
    },
    Loaded {
        summary: String,
    },
    Failed {
        message: String,
    },
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading { .. })
    }
}

struct FetchResult {
    generation: u64,
    result: Result<Vec<u8>, FetchError>,
}

struct PendingLoad {
    generation: u64,
    artifact_ref: String,
    skeleton_motion_text: String,
}

/// Owns the clock, both scenes and the control channel. Everything runs on
/// the render thread; only artifact fetches complete elsewhere.
pub struct Viewer {
    config: ViewerConfig,
    channel: ControlChannel,
    fetcher: Box<dyn ArtifactFetcher>,
    controller: PlaybackController,
    viewports: ViewportPair,
    orbit: OrbitController,
    // Bumped on every LoadData; fetches tagged with an older value are stale
    generation: u64,
    pending: Option<PendingLoad>,
    fetch_tx: Sender<FetchResult>,
    fetch_rx: Receiver<FetchResult>,
    status: LoadStatus,
}

impl Viewer {
    pub fn new(
        config: ViewerConfig,
        channel: ControlChannel,
        fetcher: Box<dyn ArtifactFetcher>,
        size: (u32, u32),
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel();
        let viewer = Self {
            controller: PlaybackController::new(config.default_fps),
            viewports: ViewportPair::new(Camera::from_config(&config.camera), size),
            config,
            channel,
            fetcher,
            orbit: OrbitController::default(),
            generation: 0,
            pending: None,
            fetch_tx,
            fetch_rx,
            status: LoadStatus::Idle,
        };
        viewer.channel.emit(ViewerEvent::Ready {
            version: VersionData::current(),
        });
        viewer
    }

    fn flush_playback_events(&mut self) {
        for event in self.controller.take_events() {
            self.channel.emit(event.into());
        }
    }

    /// Emits after any playback events already queued, keeping tick order.
    fn emit(&mut self, event: ViewerEvent) {
        self.flush_playback_events();
        self.channel.emit(event);
    }

    fn handle_command(&mut self, command: HostMessage) {
        match command {
            HostMessage::LoadData {
                mesh_artifact_ref,
                skeleton_motion_text,
            } => self.begin_load(mesh_artifact_ref, skeleton_motion_text),
            HostMessage::Play => self.controller.play(),
            HostMessage::Pause => self.controller.pause(),
            HostMessage::Seek { frame } => self.controller.seek(frame),
            HostMessage::SetSpeed { value } => self.controller.set_speed(value),
        }
    }

    fn begin_load(&mut self, artifact_ref: String, skeleton_motion_text: String) {
        self.generation += 1;
        if let Some(pending) = &self.pending {
            info!(
                "Load of {} superseded by {}",
                pending.artifact_ref, artifact_ref
            );
        }

        self.controller.unload();
        self.viewports.clear();

        self.status = LoadStatus::Loading {
            artifact_ref: artifact_ref.clone(),
        };
        self.emit(ViewerEvent::Loading {
            mesh_artifact_ref: artifact_ref.clone(),
        });

        let generation = self.generation;
        let tx = self.fetch_tx.clone();
        self.fetcher.fetch(
            &artifact_ref,
            Box::new(move |result| {
                let _ = tx.send(FetchResult { generation, result });
            }),
        );
        self.pending = Some(PendingLoad {
            generation,
            artifact_ref,
            skeleton_motion_text,
        });
    }

    fn poll_fetches(&mut self) {
        while let Ok(FetchResult { generation, result }) = self.fetch_rx.try_recv() {
            match self.pending.take() {
                Some(pending) if pending.generation == generation => {
                    self.finish_load(pending, result)
                }
                pending => {
                    warn!(
                        "Discarding stale artifact fetch from load #{} (current #{})",
                        generation, self.generation
                    );
                    self.pending = pending;
                }
            }
        }
    }

    fn finish_load(&mut self, pending: PendingLoad, fetched: Result<Vec<u8>, FetchError>) {
        self.viewports.clear();

        let mesh = fetched
            .map_err(LoadError::from)
            .and_then(|bytes| Ok(MeshAnimationStream::decode(&bytes)?));
        let motion =
            SkeletalMotion::parse(&pending.skeleton_motion_text).map_err(LoadError::from);

        match (mesh, motion) {
            (Ok(mesh), Ok(motion)) => {
                let mesh = MeshDrawable::new(mesh, self.config.mesh_color);
                let skeleton = SkeletonDrawable::new(motion, self.config.skeleton_color);
                let mesh_frames = mesh.stream().frame_count();
                let skeleton_frames = skeleton.motion().clip.frame_count() as u32;
                self.controller
                    .load(Some(mesh.stream()), Some(skeleton.motion()));
                self.viewports.mesh_scene_mut().add(Box::new(mesh));
                self.viewports.skeleton_scene_mut().add(Box::new(skeleton));

                let summary = format!(
                    "Mesh frames: {} / Skeleton frames: {}",
                    mesh_frames, skeleton_frames
                );
                info!("Loaded {}: {}", pending.artifact_ref, summary);
                self.status = LoadStatus::Loaded { summary };
                self.emit(ViewerEvent::Loaded {
                    mesh_frames,
                    skeleton_frames,
                    total_frames: self.controller.total_frames(),
                    fps: self.controller.fps(),
                });
            }
            (mesh, motion) => {
                // Keep whichever half did build; playback stays unloaded
                let mut errors = Vec::new();
                match mesh {
                    Ok(mesh) => self
                        .viewports
                        .mesh_scene_mut()
                        .add(Box::new(MeshDrawable::new(mesh, self.config.mesh_color))),
                    Err(err) => errors.push(err),
                }
                match motion {
                    Ok(motion) => self.viewports.skeleton_scene_mut().add(Box::new(
                        SkeletonDrawable::new(motion, self.config.skeleton_color),
                    )),
                    Err(err) => errors.push(err),
                }
                let message = errors
                    .iter()
                    .map(|err| err.to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                error!("Load of {} failed: {}", pending.artifact_ref, message);
                self.status = LoadStatus::Failed {
                    message: message.clone(),
                };
                self.emit(ViewerEvent::LoadFailed { message });
            }
        }
    }

    /// One display refresh, up to but excluding drawing: drain commands and
    /// fetches, move the camera, advance the clock, push the frame into both
    /// scenes.
    pub fn tick(&mut self, delta_time: f32) {
        for command in self.channel.drain() {
            self.handle_command(command);
        }
        self.poll_fetches();

        self.orbit.update(self.viewports.camera_mut());
        if self.controller.is_playing() {
            self.controller.tick(delta_time);
        }
        let cursor = self.controller.cursor();
        self.viewports.update_for_frame(&cursor);

        self.flush_playback_events();
    }

    pub fn prepare(&mut self, device: &Device, queue: &Queue) {
        self.viewports.mesh_scene_mut().prepare(device, queue);
        self.viewports.skeleton_scene_mut().prepare(device, queue);
    }

    pub fn render(&self, pass: &mut impl RegionPass) {
        self.viewports.render(pass);
    }

    pub fn resize(&mut self, size: (u32, u32)) {
        self.viewports.resize(size);
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn command_sender(&self) -> Sender<HostMessage> {
        self.channel.sender()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn viewports(&self) -> &ViewportPair {
        &self.viewports
    }

    pub fn orbit_mut(&mut self) -> &mut OrbitController {
        &mut self.orbit
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use viewer_protocol::message::ViewerEvent;

    use crate::{channel::HostEndpoint, fetch::FetchCallback};

    use super::*;

    const MOTION: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 3 Xposition Yposition Zposition
  End Site
  {
    OFFSET 0 1 0
  }
}
MOTION
Frames: 4
Frame Time: 0.1
0 0 0
1 0 0
2 0 0
3 0 0
";

    type Requests = Arc<Mutex<Vec<(String, FetchCallback)>>>;

    #[derive(Clone, Default)]
    struct ManualFetcher {
        requests: Requests,
    }

    impl ManualFetcher {
        fn complete(&self, index: usize, result: Result<Vec<u8>, FetchError>) {
            let (_, on_done) = self.requests.lock().unwrap().remove(index);
            on_done(result);
        }
    }

    impl ArtifactFetcher for ManualFetcher {
        fn fetch(&self, artifact_ref: &str, on_done: FetchCallback) {
            self.requests
                .lock()
                .unwrap()
                .push((artifact_ref.to_string(), on_done));
        }
    }

    fn mesh_bytes(frame_count: u32) -> Vec<u8> {
        let vertices = (0..frame_count * 9).map(|value| value as f32).collect();
        MeshAnimationStream::new(frame_count, 3, 10.0, vertices, vec![0, 1, 2])
            .unwrap()
            .encode()
    }

    fn setup() -> (Viewer, HostEndpoint, ManualFetcher) {
        let (channel, host) = ControlChannel::new();
        let fetcher = ManualFetcher::default();
        let viewer = Viewer::new(
            ViewerConfig::default(),
            channel,
            Box::new(fetcher.clone()),
            (800, 600),
        );
        (viewer, host, fetcher)
    }

    fn load(host: &HostEndpoint, artifact_ref: &str, motion: &str) {
        host.commands
            .send(HostMessage::LoadData {
                mesh_artifact_ref: artifact_ref.to_string(),
                skeleton_motion_text: motion.to_string(),
            })
            .unwrap();
    }

    fn events(host: &HostEndpoint) -> Vec<ViewerEvent> {
        host.events.try_iter().collect()
    }

    #[test]
    fn test_ready_on_start() {
        let (_viewer, host, _) = setup();
        assert!(matches!(events(&host)[..], [ViewerEvent::Ready { .. }]));
    }

    #[test]
    fn test_load_publishes_summary() {
        let (mut viewer, host, fetcher) = setup();
        events(&host);
        load(&host, "a.bin", MOTION);
        viewer.tick(0.0);
        assert!(viewer.status().is_loading());
        assert_eq!(
            events(&host),
            vec![ViewerEvent::Loading {
                mesh_artifact_ref: "a.bin".to_string()
            }]
        );

        fetcher.complete(0, Ok(mesh_bytes(6)));
        viewer.tick(0.0);
        assert_eq!(
            events(&host),
            vec![ViewerEvent::Loaded {
                mesh_frames: 6,
                skeleton_frames: 4,
                total_frames: 6,
                fps: 10.0,
            }]
        );
        assert_eq!(
            viewer.status(),
            &LoadStatus::Loaded {
                summary: "Mesh frames: 6 / Skeleton frames: 4".to_string()
            }
        );
        assert_eq!(viewer.viewports().mesh_scene().object_count(), 1);
        assert_eq!(viewer.viewports().skeleton_scene().object_count(), 1);
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let (mut viewer, host, fetcher) = setup();
        load(&host, "old.bin", MOTION);
        viewer.tick(0.0);
        load(&host, "new.bin", MOTION);
        viewer.tick(0.0);
        events(&host);

        // The newer request completes first, then the old one arrives late
        fetcher.complete(1, Ok(mesh_bytes(3)));
        fetcher.complete(0, Ok(mesh_bytes(9)));
        viewer.tick(0.0);

        assert_eq!(viewer.controller().total_frames(), 4);
        let mesh_frames: Vec<u32> = events(&host)
            .into_iter()
            .filter_map(|event| match event {
                ViewerEvent::Loaded { mesh_frames, .. } => Some(mesh_frames),
                _ => None,
            })
            .collect();
        assert_eq!(mesh_frames, vec![3]);
    }

    #[test]
    fn test_stale_fetch_does_not_finish_newer_load() {
        let (mut viewer, host, fetcher) = setup();
        load(&host, "old.bin", MOTION);
        viewer.tick(0.0);
        load(&host, "new.bin", MOTION);
        viewer.tick(0.0);

        fetcher.complete(0, Ok(mesh_bytes(9)));
        viewer.tick(0.0);
        assert!(viewer.status().is_loading());
        assert_eq!(viewer.controller().total_frames(), 0);

        fetcher.complete(0, Ok(mesh_bytes(3)));
        viewer.tick(0.0);
        assert_eq!(viewer.controller().total_frames(), 4);
    }

    #[test]
    fn test_fetch_failure_keeps_skeleton() {
        let (mut viewer, host, fetcher) = setup();
        load(&host, "missing.bin", MOTION);
        viewer.tick(0.0);
        events(&host);

        fetcher.complete(
            0,
            Err(FetchError::Status {
                url: "http://host/missing.bin".to_string(),
                status: 404,
                text: "Not Found".to_string(),
            }),
        );
        viewer.tick(0.0);

        let message = "Failed to fetch mesh artifact: Request to http://host/missing.bin returned 404 Not Found";
        assert_eq!(
            events(&host),
            vec![ViewerEvent::LoadFailed {
                message: message.to_string()
            }]
        );
        assert_eq!(
            viewer.status(),
            &LoadStatus::Failed {
                message: message.to_string()
            }
        );
        assert!(viewer.viewports().mesh_scene().is_empty());
        assert_eq!(viewer.viewports().skeleton_scene().object_count(), 1);
        assert_eq!(viewer.controller().total_frames(), 0);
    }

    #[test]
    fn test_format_and_parse_errors_are_reported() {
        let (mut viewer, host, fetcher) = setup();
        load(&host, "a.bin", "HIERARCHY\nROOT Hips\n{\n");
        viewer.tick(0.0);
        events(&host);

        fetcher.complete(0, Ok(vec![0; 8]));
        viewer.tick(0.0);
        let LoadStatus::Failed { message } = viewer.status() else {
            panic!("expected failure, got {:?}", viewer.status());
        };
        assert!(message.starts_with("Invalid mesh artifact"));
        assert!(message.contains("Invalid skeletal motion"));
        assert!(viewer.viewports().mesh_scene().is_empty());
        assert!(viewer.viewports().skeleton_scene().is_empty());
    }

    #[test]
    fn test_playback_commands_emit_events() {
        let (mut viewer, host, fetcher) = setup();
        load(&host, "a.bin", MOTION);
        viewer.tick(0.0);
        fetcher.complete(0, Ok(mesh_bytes(6)));
        viewer.tick(0.0);
        events(&host);

        host.commands.send(HostMessage::SetSpeed { value: 2.0 }).unwrap();
        host.commands.send(HostMessage::Play).unwrap();
        viewer.tick(0.1);
        assert_eq!(
            events(&host),
            vec![
                ViewerEvent::Playing,
                ViewerEvent::FrameChanged {
                    frame: 2.0,
                    total_frames: 6
                }
            ]
        );

        host.commands.send(HostMessage::Pause).unwrap();
        host.commands.send(HostMessage::Seek { frame: 5.0 }).unwrap();
        viewer.tick(0.1);
        assert_eq!(
            events(&host),
            vec![
                ViewerEvent::Paused,
                ViewerEvent::FrameChanged {
                    frame: 5.0,
                    total_frames: 6
                }
            ]
        );
    }
}
