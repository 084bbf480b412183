//! Single-pose inverse kinematics.
//!
//! The engine consumes a [`PoseSolver`]: anything that, given a chain, a target
//! and a starting joint vector, returns its best joint vector together with
//! the error it actually achieved. Solves never fail; an unreachable target
//! yields a best-effort [`SolveOutcome`] whose error the caller interprets.
//!
//! [`DlsSolver`] is the default implementation: damped least squares on the
//! geometric Jacobian, warm-started from the initial guess so different
//! seeds land on different branches of the solution set. When an iteration
//! leaves the joints where they were (the straight arm has no Jacobian column
//! toward most targets, and a joint held at its bound cannot follow the
//! step), every revolute joint is nudged towards the middle of its range and
//! the iteration continues from there.

use nalgebra::{DMatrix, DVector, Isometry3, Point3, UnitQuaternion, Vector3};
use tracing::debug;

use crate::chain::{Chain, JointVector, LinkKind};
use crate::kinematics::{forward_kinematics, Frame};
use crate::pose::Pose;

/// What the solver should reach
#[derive(Debug, Clone, PartialEq)]
pub enum IkTarget {
    /// End-effector position only
    Position(Point3<f64>),
    /// Position and orientation
    Pose(Isometry3<f64>),
}

/// Best-effort result of one solve
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Raw solved vector, one entry per link
    pub joints: JointVector,
    /// Frames from forward kinematics on `joints`, root first
    pub frames: Vec<Frame>,
    /// Distance between the achieved and the target position
    pub position_error: f64,
    /// Rotation angle between achieved and target orientation, 0 for position targets
    pub orientation_error: f64,
    pub converged: bool,
    pub iterations: u32,
}

impl SolveOutcome {
    pub fn end_effector(&self) -> Frame {
        self.frames.last().copied().unwrap_or_else(Isometry3::identity)
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.end_effector().rotation
    }

    /// True when the achieved position is within `tolerance` of the target
    pub fn within(&self, tolerance: f64) -> bool {
        self.position_error <= tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.joints.iter().all(|v| v.is_finite())
            && self.frames.iter().all(|f| f.translation.vector.iter().all(|v| v.is_finite()))
    }
}

/// Nonlinear pose-solving capability.
///
/// Implementations must be deterministic for a fixed target and initial
/// guess, respect each link's bound, and return a best-effort result for
/// unreachable targets.
pub trait PoseSolver: Send + Sync {
    fn solve(&self, chain: &Chain, target: &IkTarget, initial: &[f64]) -> SolveOutcome;

    /// Whether orientation targets are honoured
    fn supports_orientation(&self) -> bool {
        true
    }
}

/// Solve a Cartesian pose.
///
/// The orientation is only constrained when asked for, when the pose carries
/// one and when the solver supports it; otherwise the solve is position-only.
pub fn solve_pose(
    solver: &dyn PoseSolver,
    chain: &Chain,
    pose: &Pose,
    initial: &[f64],
    constrain_orientation: bool,
) -> SolveOutcome {
    let target = match pose.orientation {
        Some(_) if constrain_orientation && solver.supports_orientation() => IkTarget::Pose(pose.to_isometry()),
        _ => IkTarget::Position(pose.position),
    };
    solver.solve(chain, &target, initial)
}

/// Configuration for the DLS solver
#[derive(Debug, Clone)]
pub struct DlsConfig {
    pub max_iterations: u32,
    /// Position error tolerance in link-length units
    pub position_tolerance: f64,
    /// Orientation error tolerance (radians)
    pub angle_tolerance: f64,
    /// Damping factor (lambda)
    pub damping: f64,
    /// Largest joint-space step per iteration (radians)
    pub max_step: f64,
    /// How often a stalled solve may be nudged out of place
    pub max_escapes: u32,
    /// Size of that nudge per revolute joint (radians)
    pub escape_step: f64,
}

/// Joint-space movement below which an iteration counts as stalled
const STALL_STEP: f64 = 1e-9;

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            position_tolerance: 1e-6,
            angle_tolerance: 1e-4,
            damping: 0.05,
            max_step: 0.5,
            max_escapes: 4,
            escape_step: 0.25,
        }
    }
}

/// Damped least squares solver
#[derive(Debug, Clone, Default)]
pub struct DlsSolver {
    config: DlsConfig,
}

impl DlsSolver {
    pub const fn new(config: DlsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DlsConfig {
        &self.config
    }

    fn is_converged(&self, target: &IkTarget, pos_err: f64, ori_err: f64) -> bool {
        match target {
            IkTarget::Position(_) => pos_err < self.config.position_tolerance,
            IkTarget::Pose(_) => pos_err < self.config.position_tolerance && ori_err < self.config.angle_tolerance,
        }
    }

    /// Move every revolute joint by `escape_step` towards the middle of its range.
    fn escape(&self, chain: &Chain, revolute: &[usize], q: &mut [f64]) {
        for &i in revolute {
            if let Some((lower, upper)) = chain.links()[i].bounds() {
                let direction = if q[i] > 0.5 * (lower + upper) { -1.0 } else { 1.0 };
                q[i] += direction * self.config.escape_step;
            }
        }
        chain.clamp_to_bounds(q);
    }
}

impl PoseSolver for DlsSolver {
    fn solve(&self, chain: &Chain, target: &IkTarget, initial: &[f64]) -> SolveOutcome {
        let mut q = chain.normalize_joints(initial);
        chain.clamp_to_bounds(&mut q);

        let revolute: Vec<usize> = chain
            .links()
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_revolute())
            .map(|(i, _)| i)
            .collect();

        let lambda_sq = self.config.damping * self.config.damping;
        let mut best: Option<(JointVector, f64)> = None;
        let mut escapes = 0;
        let mut iterations = self.config.max_iterations;

        for iteration in 0..self.config.max_iterations {
            let frames = forward_kinematics(chain, &q);
            let ee = frames.last().copied().unwrap_or_else(Isometry3::identity);
            let (pos_err, ori_err, error) = compute_error(&ee, target);

            if self.is_converged(target, pos_err, ori_err) {
                debug!("DLS converged after {} iterations (pos_err={:.3e})", iteration, pos_err);
                return SolveOutcome {
                    joints: q,
                    frames,
                    position_error: pos_err,
                    orientation_error: ori_err,
                    converged: true,
                    iterations: iteration,
                };
            }

            let score = pos_err + ori_err;
            if best.as_ref().map_or(true, |(_, s)| score < *s) {
                best = Some((q.clone(), score));
            }

            let jacobian = compute_jacobian(chain, &frames, &revolute, &ee, target);
            let m = jacobian.nrows();

            // dq = J^T (J J^T + lambda^2 I)^-1 e
            let damped = &jacobian * jacobian.transpose() + DMatrix::identity(m, m) * lambda_sq;
            let Some(damped_inv) = damped.try_inverse() else {
                if escapes < self.config.max_escapes {
                    escapes += 1;
                    debug!("DLS system singular at iteration {}, nudging joints", iteration);
                    self.escape(chain, &revolute, &mut q);
                    continue;
                }
                debug!("DLS system singular at iteration {}", iteration);
                iterations = iteration;
                break;
            };
            let mut dq = jacobian.transpose() * damped_inv * error;

            let step = dq.norm();
            if step > self.config.max_step {
                dq *= self.config.max_step / step;
            }

            let previous = q.clone();
            for (k, &i) in revolute.iter().enumerate() {
                q[i] += dq[k];
            }
            chain.clamp_to_bounds(&mut q);

            let moved = revolute.iter().map(|&i| (q[i] - previous[i]).powi(2)).sum::<f64>().sqrt();
            if moved < STALL_STEP && escapes < self.config.max_escapes {
                escapes += 1;
                debug!("DLS stalled at iteration {} (pos_err={:.3e}), nudging joints", iteration, pos_err);
                self.escape(chain, &revolute, &mut q);
            }
        }

        // Best iterate seen, or the last one if it is at least as good
        let frames = forward_kinematics(chain, &q);
        let ee = frames.last().copied().unwrap_or_else(Isometry3::identity);
        let (pos_err, ori_err, _) = compute_error(&ee, target);
        let q = match best {
            Some((best_q, score)) if score < pos_err + ori_err => best_q,
            _ => q,
        };

        let frames = forward_kinematics(chain, &q);
        let ee = frames.last().copied().unwrap_or_else(Isometry3::identity);
        let (pos_err, ori_err, _) = compute_error(&ee, target);
        debug!("DLS stopped without converging (pos_err={:.3e}, ori_err={:.3e})", pos_err, ori_err);

        SolveOutcome {
            joints: q,
            frames,
            position_error: pos_err,
            orientation_error: ori_err,
            converged: self.is_converged(target, pos_err, ori_err),
            iterations,
        }
    }
}

/// Error between the end effector and the target.
///
/// Returns (position_error_norm, orientation_error_norm, error_vector).
fn compute_error(ee: &Isometry3<f64>, target: &IkTarget) -> (f64, f64, DVector<f64>) {
    match target {
        IkTarget::Position(position) => {
            let pos_err = position.coords - ee.translation.vector;
            (pos_err.norm(), 0.0, DVector::from_column_slice(pos_err.as_slice()))
        }
        IkTarget::Pose(pose) => {
            let pos_err = pose.translation.vector - ee.translation.vector;
            let ori_err: Vector3<f64> = (pose.rotation * ee.rotation.inverse()).scaled_axis();
            let error = DVector::from_column_slice(&[
                pos_err.x, pos_err.y, pos_err.z, ori_err.x, ori_err.y, ori_err.z,
            ]);
            (pos_err.norm(), ori_err.norm(), error)
        }
    }
}

/// Geometric Jacobian over the revolute links.
///
/// 3 rows for position targets, 6 (linear then angular) for pose targets.
fn compute_jacobian(
    chain: &Chain,
    frames: &[Frame],
    revolute: &[usize],
    ee: &Isometry3<f64>,
    target: &IkTarget,
) -> DMatrix<f64> {
    let rows = match target {
        IkTarget::Position(_) => 3,
        IkTarget::Pose(_) => 6,
    };
    let mut jacobian = DMatrix::zeros(rows, revolute.len());
    let ee_pos = ee.translation.vector;

    for (col, &i) in revolute.iter().enumerate() {
        let LinkKind::Revolute { axis, .. } = chain.links()[i].kind else {
            continue;
        };
        // The joint rotation leaves its own axis unchanged
        let z = frames[i].rotation * axis.into_inner();
        let linear = z.cross(&(ee_pos - frames[i].translation.vector));

        jacobian[(0, col)] = linear.x;
        jacobian[(1, col)] = linear.y;
        jacobian[(2, col)] = linear.z;
        if rows == 6 {
            jacobian[(3, col)] = z.x;
            jacobian[(4, col)] = z.y;
            jacobian[(5, col)] = z.z;
        }
    }

    jacobian
}
