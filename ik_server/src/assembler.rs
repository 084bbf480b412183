//! Converts solved joint vectors into response waypoints.

use arm_ik::{forward_kinematics, Chain, Frame, JointRole};
use ik_common::{Bone, JointAngles, Waypoint};
use nalgebra::Vector3;

/// Waypoint for a raw solved vector.
///
/// Geometry comes from forward kinematics on the unclamped vector; only the
/// reported angles are clamped.
pub fn waypoint(chain: &Chain, joints: &[f64]) -> Waypoint {
    let frames = forward_kinematics(chain, joints);
    waypoint_from_frames(chain, joints, &frames)
}

/// Same as [`waypoint`] when the frames are already known
pub fn waypoint_from_frames(chain: &Chain, joints: &[f64], frames: &[Frame]) -> Waypoint {
    let bones = chain
        .bones()
        .iter()
        .map(|bone| Bone {
            name: bone.name.clone(),
            start: point(&frames[bone.start].translation.vector),
            end: point(&frames[bone.end].translation.vector),
        })
        .collect();

    let effector = frames
        .last()
        .map(|frame| point(&frame.translation.vector))
        .unwrap_or_default();

    Waypoint {
        angles: joint_angles(chain, joints),
        bones,
        effector,
    }
}

/// Actuated angles in degrees clamped to each joint's mechanical limit
pub fn joint_angles(chain: &Chain, joints: &[f64]) -> JointAngles {
    let degrees = |role: JointRole| {
        chain.joint(role).map(|joint| {
            let (lower, upper) = joint.limit_deg;
            joints[joint.link].to_degrees().clamp(lower, upper)
        })
    };

    JointAngles {
        base_yaw_deg: degrees(JointRole::BaseYaw).unwrap_or(0.0),
        shoulder_pitch_deg: degrees(JointRole::ShoulderPitch).unwrap_or(0.0),
        forearm_pitch_deg: degrees(JointRole::ForearmPitch).unwrap_or(0.0),
        wrist_pitch_deg: degrees(JointRole::WristPitch),
    }
}

/// True when every number in the waypoint is finite
pub fn is_finite(waypoint: &Waypoint) -> bool {
    waypoint.angles.to_vec().iter().all(|v| v.is_finite())
        && waypoint.effector.iter().all(|v| v.is_finite())
        && waypoint
            .bones
            .iter()
            .all(|b| b.start.iter().chain(b.end.iter()).all(|v| v.is_finite()))
}

fn point(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}
