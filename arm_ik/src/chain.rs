//! Kinematic chain model.
//!
//! A [`Chain`] is the ordered list of links from the implicit root frame to
//! the end of the arm. Revolute links rotate about their axis after applying
//! their fixed offset; fixed links only translate. Joint vectors carry one
//! entry per link (root included) so indices line up with the frames produced
//! by forward kinematics.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Unit, UnitQuaternion, Vector3};
use tracing::warn;

use crate::arm_config::ArmConfig;
use crate::errors::IkError;

/// One scalar per link. Fixed links hold a placeholder that FK ignores.
pub type JointVector = Vec<f64>;

/// Offsets shorter than this do not count as observable geometry.
const MIN_OFFSET: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkKind {
    Fixed,
    Revolute {
        axis: Unit<Vector3<f64>>,
        lower: f64,
        upper: f64,
    },
}

/// One element of the chain
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub name: String,
    pub kind: LinkKind,
    /// Translation from the parent frame
    pub offset: Vector3<f64>,
    /// Rotation from the parent frame, identity for this arm
    pub orientation: UnitQuaternion<f64>,
}

impl LinkSpec {
    pub fn fixed(name: &str, offset: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: LinkKind::Fixed,
            offset,
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn revolute(name: &str, offset: Vector3<f64>, axis: Vector3<f64>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: LinkKind::Revolute {
                axis: Unit::new_normalize(axis),
                lower,
                upper,
            },
            offset,
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn is_revolute(&self) -> bool {
        matches!(self.kind, LinkKind::Revolute { .. })
    }

    /// Inclusive joint bound in radians, `None` for fixed links
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self.kind {
            LinkKind::Revolute { lower, upper, .. } => Some((lower, upper)),
            LinkKind::Fixed => None,
        }
    }
}

/// What an actuated joint does on the arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointRole {
    BaseYaw,
    ShoulderPitch,
    ForearmPitch,
    WristPitch,
}

impl JointRole {
    /// Pitch joints beyond the shoulder
    pub fn is_distal_pitch(&self) -> bool {
        matches!(self, JointRole::ForearmPitch | JointRole::WristPitch)
    }
}

/// A revolute link exposed to clients, with its display limit in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatedJoint {
    pub role: JointRole,
    /// Index of the revolute link in the chain
    pub link: usize,
    /// Mechanical limit used when reporting the angle
    pub limit_deg: (f64, f64),
}

/// Named segment between two frames
#[derive(Debug, Clone, PartialEq)]
pub struct BoneSpec {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl BoneSpec {
    fn new(name: &str, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
        }
    }
}

/// Immutable arm description built once per request
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    links: Vec<LinkSpec>,
    joints: Vec<ActuatedJoint>,
    bones: Vec<BoneSpec>,
}

impl Chain {
    /// Assemble a chain from explicit parts.
    ///
    /// Every revolute link must be followed by a run of fixed links with at
    /// least one nonzero offset, actuated joints must point at revolute links
    /// and bones must reference existing frames.
    pub fn new(links: Vec<LinkSpec>, joints: Vec<ActuatedJoint>, bones: Vec<BoneSpec>) -> Result<Self, IkError> {
        if links.is_empty() {
            return Err(IkError::InvalidChain("chain has no links".to_string()));
        }

        for (i, link) in links.iter().enumerate() {
            if !link.is_revolute() {
                continue;
            }
            let observable = links[i + 1..]
                .iter()
                .take_while(|next| !next.is_revolute())
                .any(|next| next.offset.norm() > MIN_OFFSET);
            if !observable {
                return Err(IkError::InvalidChain(format!(
                    "revolute link '{}' is not followed by a fixed offset",
                    link.name
                )));
            }
        }

        for joint in &joints {
            match links.get(joint.link) {
                Some(link) if link.is_revolute() => {}
                _ => {
                    return Err(IkError::InvalidChain(format!(
                        "{:?} does not reference a revolute link",
                        joint.role
                    )))
                }
            }
        }

        if let Some(bone) = bones.iter().find(|b| b.start >= links.len() || b.end >= links.len()) {
            return Err(IkError::InvalidChain(format!("bone '{}' is out of range", bone.name)));
        }

        Ok(Self { links, joints, bones })
    }

    /// Build the arm for a configuration.
    ///
    /// Never fails: lengths that would leave a joint without observable
    /// effect fall back to the default geometry.
    pub fn build(config: &ArmConfig) -> Self {
        match Self::from_config(config) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("{}; using default arm geometry", e);
                Self::default()
            }
        }
    }

    fn from_config(config: &ArmConfig) -> Result<Self, IkError> {
        let (links, joints, bones) = Self::layout(config);
        Self::new(links, joints, bones)
    }

    fn layout(config: &ArmConfig) -> (Vec<LinkSpec>, Vec<ActuatedJoint>, Vec<BoneSpec>) {
        let x = Vector3::x();
        let y = Vector3::y();
        let forearm_limit = config.forearm_limit_deg.abs();

        let mut links = vec![
            LinkSpec::fixed("origin", Vector3::zeros()),
            LinkSpec::revolute("base_yaw", Vector3::new(0.0, -1.0, 0.0), y, -PI, PI),
            LinkSpec::fixed("base", Vector3::new(0.0, config.base_length, 0.0)),
            LinkSpec::revolute("shoulder_joint", Vector3::zeros(), x, -FRAC_PI_2, FRAC_PI_2),
            LinkSpec::fixed("shoulder", Vector3::new(-config.shoulder_length, 0.0, 0.0)),
            LinkSpec::fixed("ankle", Vector3::new(0.0, config.ankle_length, 0.0)),
            LinkSpec::fixed("ankle2", Vector3::new(config.ankle2_length, 0.0, 0.0)),
            LinkSpec::revolute("forearm_joint", Vector3::zeros(), x, -3.0 * PI / 4.0, 3.0 * PI / 4.0),
            LinkSpec::fixed("forearm", Vector3::new(0.0, config.forearm_length, 0.0)),
        ];

        let mut joints = vec![
            ActuatedJoint { role: JointRole::BaseYaw, link: 1, limit_deg: (-180.0, 180.0) },
            ActuatedJoint { role: JointRole::ShoulderPitch, link: 3, limit_deg: (-90.0, 90.0) },
            ActuatedJoint { role: JointRole::ForearmPitch, link: 7, limit_deg: (-forearm_limit, forearm_limit) },
        ];

        let mut bones = vec![
            BoneSpec::new("base", 1, 2),
            BoneSpec::new("shoulder", 2, 4),
            BoneSpec::new("ankle", 4, 5),
            BoneSpec::new("ankle2", 5, 6),
            BoneSpec::new("forearm", 6, 8),
        ];

        if let Some(wrist) = &config.wrist {
            let wrist_limit = wrist.wrist_limit_deg.abs();
            links.push(LinkSpec::fixed("wrist", Vector3::new(0.0, wrist.wrist_length, 0.0)));
            links.push(LinkSpec::revolute("wrist_joint", Vector3::zeros(), x, -3.0 * PI / 4.0, 3.0 * PI / 4.0));
            links.push(LinkSpec::fixed("hand", Vector3::new(0.0, wrist.hand_length, 0.0)));
            joints.push(ActuatedJoint { role: JointRole::WristPitch, link: 10, limit_deg: (-wrist_limit, wrist_limit) });
            bones.push(BoneSpec::new("wrist", 8, 9));
            bones.push(BoneSpec::new("hand", 10, 11));
        }

        (links, joints, bones)
    }

    /// Number of links, root included
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[LinkSpec] {
        &self.links
    }

    /// Actuated joints, proximal to distal
    pub fn joints(&self) -> &[ActuatedJoint] {
        &self.joints
    }

    pub fn bones(&self) -> &[BoneSpec] {
        &self.bones
    }

    pub fn joint(&self, role: JointRole) -> Option<&ActuatedJoint> {
        self.joints.iter().find(|j| j.role == role)
    }

    pub fn has_wrist(&self) -> bool {
        self.joint(JointRole::WristPitch).is_some()
    }

    pub fn zero_joints(&self) -> JointVector {
        vec![0.0; self.links.len()]
    }

    /// Validate a joint vector against the chain length.
    ///
    /// A vector of the wrong length is replaced by the all-zero vector.
    pub fn normalize_joints(&self, joints: &[f64]) -> JointVector {
        if joints.len() == self.links.len() {
            joints.to_vec()
        } else {
            warn!(
                "joint vector has {} entries, chain has {} links; using zeros",
                joints.len(),
                self.links.len()
            );
            self.zero_joints()
        }
    }

    /// Clamp every revolute entry to its link bound.
    pub fn clamp_to_bounds(&self, joints: &mut [f64]) {
        for (value, link) in joints.iter_mut().zip(self.links.iter()) {
            if let Some((lower, upper)) = link.bounds() {
                *value = value.clamp(lower, upper);
            }
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        let (links, joints, bones) = Self::layout(&ArmConfig::default());
        Self { links, joints, bones }
    }
}
