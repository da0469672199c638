use glam::{Mat4, Quat, Vec3};

mod parser;
mod writer;

pub use parser::ParseError;

pub type JointId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Xposition" => Channel::Xposition,
            "Yposition" => Channel::Yposition,
            "Zposition" => Channel::Zposition,
            "Xrotation" => Channel::Xrotation,
            "Yrotation" => Channel::Yrotation,
            "Zrotation" => Channel::Zrotation,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Root,
    Joint,
    /// Channel-less leaf that only carries an offset.
    EndSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    name: String,
    kind: JointKind,
    offset: Vec3,
    channels: Vec<Channel>,
    // Index of this joint's first value inside a motion frame
    channel_start: usize,
    parent: Option<JointId>,
    children: Vec<JointId>,
}

impl Joint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> JointKind {
        self.kind
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_start(&self) -> usize {
        self.channel_start
    }

    pub fn parent(&self) -> Option<JointId> {
        self.parent
    }

    pub fn children(&self) -> &[JointId] {
        &self.children
    }

    pub fn is_end_site(&self) -> bool {
        self.kind == JointKind::EndSite
    }
}

/// Joint tree stored in declaration order; the root is always joint 0 and
/// every parent precedes its children.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonHierarchy {
    joints: Vec<Joint>,
    channel_count: usize,
}

impl SkeletonHierarchy {
    pub fn root(&self) -> &Joint {
        &self.joints[0]
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn find(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .position(|joint| joint.kind != JointKind::EndSite && joint.name == name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Sum of every joint's channel count, i.e. the number of values per motion frame.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn bone_count(&self) -> usize {
        self.joints
            .iter()
            .filter(|joint| joint.parent.is_some())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionClip {
    frame_count: usize,
    frame_time: f32,
    channels_per_frame: usize,
    values: Vec<f32>,
}

impl MotionClip {
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    pub fn channels_per_frame(&self) -> usize {
        self.channels_per_frame
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels_per_frame;
        &self.values[start..start + self.channels_per_frame]
    }

    /// Rounded frames per second, at least 1. 30 when the frame time is unusable.
    pub fn fps(&self) -> u32 {
        if self.frame_time > 0.0 {
            ((1.0 / self.frame_time).round() as u32).max(1)
        } else {
            30
        }
    }

    pub fn duration(&self) -> f32 {
        self.frame_time * self.frame_count as f32
    }

    /// Snaps `time` (seconds) to `floor(time / frame_time)`, clamped into the clip.
    ///
    /// Frame times are usually written with a few decimals (`0.041667` for
    /// 24 fps), so a quotient falling just short of a whole frame counts as
    /// that frame.
    pub fn frame_index_at(&self, time: f32) -> usize {
        if self.frame_count == 0 || !(self.frame_time > 0.0) || !time.is_finite() {
            return 0;
        }
        let quotient = time / self.frame_time;
        let tolerance = (quotient.abs() * FRAME_SNAP_TOLERANCE)
            .clamp(FRAME_SNAP_TOLERANCE, MAX_FRAME_SNAP);
        let index = (quotient + tolerance).floor();
        if index <= 0.0 {
            0
        } else {
            (index as usize).min(self.frame_count - 1)
        }
    }
}

// Relative, covers a frame time rounded to six decimals up to ~120 fps
const FRAME_SNAP_TOLERANCE: f32 = 1e-4;
const MAX_FRAME_SNAP: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl LocalTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

/// Per-joint local transforms, indexed by [`JointId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    transforms: Vec<LocalTransform>,
}

impl Pose {
    /// Rest pose: every joint at its offset with no rotation.
    pub fn rest(hierarchy: &SkeletonHierarchy) -> Self {
        Self {
            transforms: hierarchy
                .joints
                .iter()
                .map(|joint| LocalTransform {
                    translation: joint.offset,
                    rotation: Quat::IDENTITY,
                })
                .collect(),
        }
    }

    pub fn get(&self, id: JointId) -> Option<&LocalTransform> {
        self.transforms.get(id)
    }

    pub fn transforms(&self) -> &[LocalTransform] {
        &self.transforms
    }

    pub fn world_matrices(&self, hierarchy: &SkeletonHierarchy) -> Vec<Mat4> {
        let mut matrices: Vec<Mat4> = Vec::with_capacity(self.transforms.len());
        for (joint, local) in hierarchy.joints.iter().zip(&self.transforms) {
            let parent = joint
                .parent
                .map(|parent| matrices[parent])
                .unwrap_or(Mat4::IDENTITY);
            matrices.push(parent * local.matrix());
        }
        matrices
    }

    pub fn world_positions(&self, hierarchy: &SkeletonHierarchy) -> Vec<Vec3> {
        self.world_matrices(hierarchy)
            .iter()
            .map(|matrix| matrix.w_axis.truncate())
            .collect()
    }
}

/// Local transforms of every joint at `time` seconds, snapped to the nearest
/// structural frame below it.
pub fn pose_at(hierarchy: &SkeletonHierarchy, clip: &MotionClip, time: f32) -> Pose {
    let mut pose = Pose::rest(hierarchy);
    if clip.frame_count == 0 || clip.channels_per_frame != hierarchy.channel_count {
        return pose;
    }
    let frame = clip.frame(clip.frame_index_at(time));
    for (joint, local) in hierarchy.joints.iter().zip(pose.transforms.iter_mut()) {
        let values = &frame[joint.channel_start..joint.channel_start + joint.channels.len()];
        for (channel, value) in joint.channels.iter().zip(values) {
            match channel {
                Channel::Xposition => local.translation.x = *value,
                Channel::Yposition => local.translation.y = *value,
                Channel::Zposition => local.translation.z = *value,
                Channel::Xrotation => {
                    local.rotation *= Quat::from_rotation_x(value.to_radians());
                }
                Channel::Yrotation => {
                    local.rotation *= Quat::from_rotation_y(value.to_radians());
                }
                Channel::Zrotation => {
                    local.rotation *= Quat::from_rotation_z(value.to_radians());
                }
            }
        }
        local.rotation = local.rotation.normalize();
    }
    pose
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalMotion {
    pub hierarchy: SkeletonHierarchy,
    pub clip: MotionClip,
}

impl SkeletalMotion {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    pub fn pose_at(&self, time: f32) -> Pose {
        pose_at(&self.hierarchy, &self.clip, time)
    }

    pub fn to_bvh_string(&self) -> String {
        writer::write(&self.hierarchy, &self.clip)
    }
}

#[cfg(test)]
mod test {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const ARM: &str = "HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Arm
\t{
\t\tOFFSET 0.0 2.0 0.0
\t\tCHANNELS 1 Zrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 1.0 0.0 0.0
\t\t}
\t}
}
MOTION
Frames: 3
Frame Time: 0.5
0 0 0 0 0 0 0
1 2 3 0 0 0 90
4 5 6 90 0 0 0
";

    fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_frame_index_snapping() {
        let motion = SkeletalMotion::parse(ARM).unwrap();
        let clip = &motion.clip;
        assert_eq!(clip.frame_index_at(0.0), 0);
        assert_eq!(clip.frame_index_at(0.49), 0);
        assert_eq!(clip.frame_index_at(0.5), 1);
        assert_eq!(clip.frame_index_at(0.99), 1);
        assert_eq!(clip.frame_index_at(-3.0), 0);
        assert_eq!(clip.frame_index_at(100.0), 2);
        assert_eq!(clip.fps(), 2);
    }

    fn single_channel_clip(frame_count: usize, frame_time: &str) -> MotionClip {
        let mut text = String::from(
            "HIERARCHY\nROOT Hips\n{\nOFFSET 0 0 0\nCHANNELS 1 Xposition\nEnd Site\n{\nOFFSET 0 1 0\n}\n}\n",
        );
        text.push_str(&format!(
            "MOTION\nFrames: {}\nFrame Time: {}\n",
            frame_count, frame_time
        ));
        for frame in 0..frame_count {
            text.push_str(&format!("{}\n", frame));
        }
        SkeletalMotion::parse(&text).unwrap().clip
    }

    #[test]
    fn test_rounded_frame_time_lands_on_whole_frames() {
        for (fps, frame_time) in [(24.0f32, "0.041667"), (60.0, "0.016667"), (30.0, "0.033333")] {
            let clip = single_channel_clip(400, frame_time);
            for frame in 0..400usize {
                assert_eq!(
                    clip.frame_index_at(frame as f32 / fps),
                    frame,
                    "fps {} frame time {}",
                    fps,
                    frame_time
                );
            }
            // Half way between frames still snaps down
            assert_eq!(clip.frame_index_at(10.5 / fps), 10);
        }
    }

    #[test]
    fn test_fps_of_slow_clip() {
        let clip = single_channel_clip(2, "3.0");
        assert_eq!(clip.fps(), 1);
        assert_eq!(single_channel_clip(2, "0.041667").fps(), 24);
    }

    #[test]
    fn test_pose_assigns_declared_channels() {
        let motion = SkeletalMotion::parse(ARM).unwrap();
        let pose = motion.pose_at(0.5);
        let hips = pose.get(0).unwrap();
        assert_vec3_eq(hips.translation, Vec3::new(1.0, 2.0, 3.0));
        assert!(hips.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));

        let arm = pose.get(1).unwrap();
        assert_vec3_eq(arm.translation, Vec3::new(0.0, 2.0, 0.0));
        assert!(arm
            .rotation
            .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-5));
    }

    #[test]
    fn test_world_positions_follow_parent_rotation() {
        let motion = SkeletalMotion::parse(ARM).unwrap();
        let positions = motion.pose_at(0.5).world_positions(&motion.hierarchy);
        assert_eq!(positions.len(), 3);
        assert_vec3_eq(positions[0], Vec3::new(1.0, 2.0, 3.0));
        assert_vec3_eq(positions[1], Vec3::new(1.0, 4.0, 3.0));
        // End site offset (1, 0, 0) rotated 90 degrees around Z
        assert_vec3_eq(positions[2], Vec3::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn test_pose_holds_last_frame() {
        let motion = SkeletalMotion::parse(ARM).unwrap();
        assert_eq!(motion.pose_at(1.0), motion.pose_at(60.0));
        let root = motion.pose_at(60.0).get(0).copied().unwrap();
        assert_vec3_eq(root.translation, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_rest_pose_for_empty_clip() {
        let text = ARM.replace("Frames: 3", "Frames: 0");
        let text = text.split("Frame Time: 0.5").next().unwrap().to_string() + "Frame Time: 0.5\n";
        let motion = SkeletalMotion::parse(&text).unwrap();
        assert_eq!(motion.pose_at(1.0), Pose::rest(&motion.hierarchy));
    }

    #[test]
    fn test_written_text_parses_back() {
        let motion = SkeletalMotion::parse(ARM).unwrap();
        let text = motion.to_bvh_string();
        assert!(text.starts_with("HIERARCHY\nROOT Hips\n"));
        assert_eq!(SkeletalMotion::parse(&text).unwrap(), motion);
    }
}
