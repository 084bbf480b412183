pub mod arm_config;
pub mod chain;
pub mod errors;
pub use errors::*;

pub mod kinematics;
pub mod pose;
pub mod solver;

/// Interpolation of interior poses between an origin and a target.
pub mod trajectory;

/// Multi-candidate solving that keeps consecutive waypoints on one branch.
pub mod selector;

pub use arm_config::{ArmConfig, WristConfig};
pub use chain::{ActuatedJoint, BoneSpec, Chain, JointRole, JointVector, LinkKind, LinkSpec};
pub use kinematics::{end_effector, forward_kinematics, geodesic_angle, Frame};
pub use pose::Pose;
pub use selector::{
    CandidateStrategy, ContinuitySelector, ContinuityState, ContinuityWeights, PerturbationStrategy,
    SelectorConfig, SolvedPose,
};
pub use solver::{solve_pose, DlsConfig, DlsSolver, IkTarget, PoseSolver, SolveOutcome};
pub use trajectory::{MotionInterpolator, SampleSpec, ScrewInterpolator, TrajectoryGenerator};
