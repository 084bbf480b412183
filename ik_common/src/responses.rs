//! Response types written back to clients.

use arm_ik::IkError;
use serde::{Deserialize, Serialize};

/// Actuated joint angles in degrees, clamped to the mechanical limits
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JointAngles {
    pub base_yaw_deg: f64,
    pub shoulder_pitch_deg: f64,
    pub forearm_pitch_deg: f64,
    /// Only present when the arm has a wrist stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrist_pitch_deg: Option<f64>,
}

impl JointAngles {
    /// Number of reported angles
    pub fn count(&self) -> usize {
        3 + usize::from(self.wrist_pitch_deg.is_some())
    }

    /// Angles proximal to distal
    pub fn to_vec(&self) -> Vec<f64> {
        let mut angles = vec![self.base_yaw_deg, self.shoulder_pitch_deg, self.forearm_pitch_deg];
        angles.extend(self.wrist_pitch_deg);
        angles
    }
}

/// Named rigid segment between two frame origins
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub start: [f64; 3],
    pub end: [f64; 3],
}

/// One solved pose along the trajectory
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub angles: JointAngles,
    pub bones: Vec<Bone>,
    pub effector: [f64; 3],
}

/// Successful response.
///
/// `angles`, `bones` and `effector` repeat the final waypoint at the top level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IkResponse {
    pub intermediates: Vec<Waypoint>,
    #[serde(rename = "final")]
    pub final_waypoint: Waypoint,
    pub angles: JointAngles,
    pub bones: Vec<Bone>,
    pub effector: [f64; 3],
}

impl IkResponse {
    pub fn new(intermediates: Vec<Waypoint>, final_waypoint: Waypoint) -> Self {
        Self {
            intermediates,
            angles: final_waypoint.angles.clone(),
            bones: final_waypoint.bones.clone(),
            effector: final_waypoint.effector,
            final_waypoint,
        }
    }
}

/// Failure response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&IkError> for ErrorResponse {
    fn from(err: &IkError) -> Self {
        Self {
            error: err.code().to_string(),
            details: err.details().map(str::to_string),
        }
    }
}
