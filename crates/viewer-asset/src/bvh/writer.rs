use std::fmt::Write;

use super::{JointId, JointKind, MotionClip, SkeletonHierarchy};

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_joint(out: &mut String, hierarchy: &SkeletonHierarchy, id: JointId, depth: usize) {
    let joint = &hierarchy.joints[id];
    indent(out, depth);
    match joint.kind {
        JointKind::Root => {
            let _ = writeln!(out, "ROOT {}", joint.name);
        }
        JointKind::Joint => {
            let _ = writeln!(out, "JOINT {}", joint.name);
        }
        JointKind::EndSite => out.push_str("End Site\n"),
    }
    indent(out, depth);
    out.push_str("{\n");

    indent(out, depth + 1);
    let offset = joint.offset;
    let _ = writeln!(out, "OFFSET {} {} {}", offset.x, offset.y, offset.z);
    if !joint.is_end_site() {
        indent(out, depth + 1);
        let _ = write!(out, "CHANNELS {}", joint.channels.len());
        for channel in &joint.channels {
            out.push(' ');
            out.push_str(channel.name());
        }
        out.push('\n');
    }
    for child in &joint.children {
        write_joint(out, hierarchy, *child, depth + 1);
    }

    indent(out, depth);
    out.push_str("}\n");
}

pub(super) fn write(hierarchy: &SkeletonHierarchy, clip: &MotionClip) -> String {
    let mut out = String::from("HIERARCHY\n");
    if !hierarchy.is_empty() {
        write_joint(&mut out, hierarchy, 0, 0);
    }

    out.push_str("MOTION\n");
    let _ = writeln!(out, "Frames: {}", clip.frame_count);
    let _ = writeln!(out, "Frame Time: {}", clip.frame_time);
    if clip.channels_per_frame > 0 {
        for frame in clip.values.chunks(clip.channels_per_frame) {
            let line: Vec<String> = frame.iter().map(|value| value.to_string()).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
    }
    out
}
