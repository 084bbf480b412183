// Forward kinematics for the link chain

use nalgebra::{Isometry3, Translation3, UnitQuaternion};

use crate::chain::{Chain, LinkKind, LinkSpec};

/// Pose of one link frame in root coordinates
pub type Frame = Isometry3<f64>;

/// Local transform of a link for a joint value.
///
/// Fixed links translate by their offset; revolute links translate and then
/// rotate about their axis by `value`.
pub fn link_transform(link: &LinkSpec, value: f64) -> Isometry3<f64> {
    let origin = Isometry3::from_parts(Translation3::from(link.offset), link.orientation);
    match link.kind {
        LinkKind::Fixed => origin,
        LinkKind::Revolute { axis, .. } => {
            origin * Isometry3::from_parts(Translation3::identity(), UnitQuaternion::from_axis_angle(&axis, value))
        }
    }
}

/// Compute every link frame for a joint vector, root first.
///
/// # Panics
///
/// Panics if `joints.len() != chain.len()`.
pub fn forward_kinematics(chain: &Chain, joints: &[f64]) -> Vec<Frame> {
    assert_eq!(joints.len(), chain.len(), "joint vector length must equal chain length");

    let mut frames = Vec::with_capacity(chain.len());
    let mut transform = Isometry3::identity();
    for (link, &value) in chain.links().iter().zip(joints.iter()) {
        transform *= link_transform(link, value);
        frames.push(transform);
    }
    frames
}

/// End-effector frame, the last link of the chain
pub fn end_effector(chain: &Chain, joints: &[f64]) -> Frame {
    let frames = forward_kinematics(chain, joints);
    frames.last().copied().unwrap_or_else(Isometry3::identity)
}

/// Angle of the relative rotation between two orientations (radians).
///
/// Uses the trace of `Raᵀ Rb`, clamped so rounding never leaves the acos domain.
pub fn geodesic_angle(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    let ra = a.to_rotation_matrix();
    let rb = b.to_rotation_matrix();
    let relative = ra.matrix().transpose() * rb.matrix();
    let cos_angle = ((relative.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    cos_angle.acos()
}
