use std::sync::{Arc, Mutex};

use glam::Vec3;
use viewer::{
    channel::{ControlChannel, HostEndpoint},
    config::ViewerConfig,
    fetch::{ArtifactFetcher, FetchCallback, FetchError},
    playback::PlaybackState,
    scene::Scene,
    viewer::Viewer,
    viewport::{Region, RegionPass, ViewportSide},
};
use viewer_protocol::message::{HostMessage, ViewerEvent};

const TWO_FRAME_MOTION: &str = "HIERARCHY
ROOT Hips
{
\tOFFSET 0 0 0
\tCHANNELS 3 Xposition Yposition Zposition
\tJOINT Spine
\t{
\t\tOFFSET 0 1 0
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0 1 0
\t\t}
\t}
}
MOTION
Frames: 2
Frame Time: 0.5
0 0 0 0 0 0
5 0 0 0 0 0
";

type Requests = Arc<Mutex<Vec<(String, FetchCallback)>>>;

#[derive(Clone, Default)]
struct ManualFetcher {
    requests: Requests,
}

impl ManualFetcher {
    fn complete_next(&self, result: Result<Vec<u8>, FetchError>) -> String {
        let (artifact_ref, on_done) = self.requests.lock().unwrap().remove(0);
        on_done(result);
        artifact_ref
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

/// Remembers what each half would have drawn.
#[derive(Default)]
struct RecordingPass {
    regions: Vec<Region>,
    drawn: Vec<(ViewportSide, Vec<Vec3>)>,
}

impl RegionPass for RecordingPass {
    fn restrict(&mut self, region: Region) {
        self.regions.push(region);
    }

    fn draw_scene(&mut self, side: ViewportSide, scene: &Scene) {
        self.drawn.push((side, scene.positions()));
    }
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(bytes: &mut Vec<u8>, value: f32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

/// Two frames of one triangle, the second pose shifted up by one.
fn two_frame_triangle() -> Vec<u8> {
    let mut bytes = b"VANM".to_vec();
    push_u32(&mut bytes, 2);
    push_u32(&mut bytes, 3);
    push_u32(&mut bytes, 1);
    push_f32(&mut bytes, 2.0);
    for shift in [0.0, 1.0] {
        for [x, y, z] in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]] {
            push_f32(&mut bytes, x);
            push_f32(&mut bytes, y + shift);
            push_f32(&mut bytes, z);
        }
    }
    for index in [0, 1, 2] {
        push_u32(&mut bytes, index);
    }
    bytes
}

fn long_mesh(frame_count: u32) -> Vec<u8> {
    let mut bytes = b"VANM".to_vec();
    push_u32(&mut bytes, frame_count);
    push_u32(&mut bytes, 3);
    push_u32(&mut bytes, 1);
    push_f32(&mut bytes, 30.0);
    for frame in 0..frame_count {
        for vertex in 0..3 {
            push_f32(&mut bytes, frame as f32);
            push_f32(&mut bytes, vertex as f32);
            push_f32(&mut bytes, 0.0);
        }
    }
    for index in [0, 1, 2] {
        push_u32(&mut bytes, index);
    }
    bytes
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

fn send_load(host: &HostEndpoint, artifact_ref: &str) {
    host.commands
        .send(HostMessage::LoadData {
            mesh_artifact_ref: artifact_ref.to_string(),
            skeleton_motion_text: TWO_FRAME_MOTION.to_string(),
        })
        .unwrap();
}

fn events(host: &HostEndpoint) -> Vec<ViewerEvent> {
    host.events.try_iter().collect()
}

#[test]
fn test_seek_shows_second_pose_in_both_halves() {
    let (mut viewer, host, fetcher) = setup();
    send_load(&host, "run/1");
    viewer.tick(0.0);
    assert_eq!(fetcher.complete_next(Ok(two_frame_triangle())), "run/1");
    viewer.tick(0.0);

    let loaded = events(&host);
    assert!(loaded.contains(&ViewerEvent::Loaded {
        mesh_frames: 2,
        skeleton_frames: 2,
        total_frames: 2,
        fps: 2.0,
    }));

    host.commands.send(HostMessage::Seek { frame: 1.0 }).unwrap();
    viewer.tick(0.0);

    let mut pass = RecordingPass::default();
    viewer.render(&mut pass);
    assert_eq!(pass.regions.len(), 2);
    assert_eq!(pass.regions[0].width, 400);
    assert_eq!(pass.regions[1].x, 400);

    let (side, mesh) = &pass.drawn[0];
    assert_eq!(*side, ViewportSide::Left);
    assert_eq!(
        *mesh,
        vec![
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        ]
    );

    // Root translated to x = 5 in the second frame
    let (side, skeleton) = &pass.drawn[1];
    assert_eq!(*side, ViewportSide::Right);
    assert!(!skeleton.is_empty());
    assert!(skeleton.iter().all(|point| (point.x - 5.0).abs() < 1e-5));
}

#[test]
fn test_reload_while_playing_resets_clock_and_scenes() {
    let (mut viewer, host, fetcher) = setup();
    send_load(&host, "first");
    viewer.tick(0.0);
    fetcher.complete_next(Ok(long_mesh(100)));
    viewer.tick(0.0);
    let mesh_objects = viewer.viewports().mesh_scene().object_count();
    let skeleton_objects = viewer.viewports().skeleton_scene().object_count();
    assert!(mesh_objects > 0);
    assert!(skeleton_objects > 0);

    host.commands.send(HostMessage::Play).unwrap();
    host.commands.send(HostMessage::Seek { frame: 50.0 }).unwrap();
    viewer.tick(0.0);
    assert_eq!(viewer.controller().state(), PlaybackState::Playing);
    assert_eq!(viewer.controller().current_frame(), 50.0);
    events(&host);

    send_load(&host, "second");
    viewer.tick(0.0);
    assert_eq!(viewer.controller().state(), PlaybackState::Paused);
    assert_eq!(viewer.controller().current_frame(), 0.0);
    assert!(viewer.viewports().mesh_scene().is_empty());
    assert!(viewer.viewports().skeleton_scene().is_empty());
    let reload_events = events(&host);
    assert_eq!(reload_events.first(), Some(&ViewerEvent::Paused));
    assert!(reload_events.contains(&ViewerEvent::Loading {
        mesh_artifact_ref: "second".to_string()
    }));

    fetcher.complete_next(Ok(long_mesh(100)));
    viewer.tick(0.0);
    assert_eq!(
        viewer.viewports().mesh_scene().object_count(),
        mesh_objects
    );
    assert_eq!(
        viewer.viewports().skeleton_scene().object_count(),
        skeleton_objects
    );
    assert_eq!(viewer.controller().current_frame(), 0.0);
}

#[test]
fn test_corrupt_artifact_reports_failure_and_keeps_skeleton() {
    let (mut viewer, host, fetcher) = setup();
    send_load(&host, "broken");
    viewer.tick(0.0);
    let mut bytes = two_frame_triangle();
    bytes.truncate(bytes.len() - 2);
    fetcher.complete_next(Ok(bytes));
    viewer.tick(0.0);

    let failure = events(&host)
        .into_iter()
        .find_map(|event| match event {
            ViewerEvent::LoadFailed { message } => Some(message),
            _ => None,
        })
        .expect("LoadFailed event");
    assert!(failure.starts_with("Invalid mesh artifact: "));
    assert!(viewer.viewports().mesh_scene().is_empty());
    assert!(!viewer.viewports().skeleton_scene().is_empty());
    assert_eq!(viewer.controller().total_frames(), 0);
}
