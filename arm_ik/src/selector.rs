//! Continuity-preserving solution selection.
//!
//! Inverse kinematics for this arm is multi-valued, so solving each waypoint
//! from a fixed guess jumps between elbow and wrist branches. The selector
//! threads the previous waypoint's joints and end-effector orientation
//! through a path: every pose is solved from a set of candidate seeds derived
//! from the previous solution, and the candidate closest to it wins.
//!
//! Near the yaw axis both elbow branches continue the previous waypoint, and
//! one of them may run into a joint bound a few waypoints later. Path solves
//! therefore back up to the last waypoint with an untried reaching candidate
//! when a pose cannot be reached from the current branch.

use nalgebra::UnitQuaternion;
use tracing::debug;

use crate::chain::{Chain, JointRole, JointVector};
use crate::kinematics::{geodesic_angle, Frame};
use crate::pose::Pose;
use crate::solver::{solve_pose, PoseSolver, SolveOutcome};

/// Produces initial guesses for a waypoint from the previous solution
pub trait CandidateStrategy: Send + Sync {
    fn generate_candidates(&self, chain: &Chain, previous: &[f64]) -> Vec<JointVector>;
}

/// Previous vector plus shoulder/distal nudges that push the solver out of a
/// wrong elbow or wrist basin.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationStrategy {
    /// Nudge magnitudes in radians
    pub offsets: Vec<f64>,
    /// Also nudge shoulder and distal joints the same way, which seeds the
    /// other elbow branch
    pub aligned: bool,
}

impl Default for PerturbationStrategy {
    fn default() -> Self {
        Self {
            offsets: vec![0.5, 1.0],
            aligned: true,
        }
    }
}

/// (shoulder, distal) nudge signs, opposed pairs first
const PAIRINGS: [(f64, f64); 4] = [(1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0)];

impl CandidateStrategy for PerturbationStrategy {
    fn generate_candidates(&self, chain: &Chain, previous: &[f64]) -> Vec<JointVector> {
        let base = chain.normalize_joints(previous);
        let shoulder = chain.joint(JointRole::ShoulderPitch).map(|j| j.link);
        let distal: Vec<usize> = chain
            .joints()
            .iter()
            .filter(|j| j.role.is_distal_pitch())
            .map(|j| j.link)
            .collect();

        let pairings = if self.aligned { &PAIRINGS[..] } else { &PAIRINGS[..2] };

        let mut candidates = Vec::with_capacity(1 + pairings.len() * self.offsets.len());
        candidates.push(base.clone());

        for offset in &self.offsets {
            for &(shoulder_sign, distal_sign) in pairings {
                let mut candidate = base.clone();
                if let Some(i) = shoulder {
                    candidate[i] += shoulder_sign * offset;
                }
                for &i in &distal {
                    candidate[i] += distal_sign * offset;
                }
                chain.clamp_to_bounds(&mut candidate);
                candidates.push(candidate);
            }
        }

        candidates
    }
}

/// Weights of the continuity cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuityWeights {
    pub joint_weight: f64,
    /// Weight of the most distal actuated joint
    pub distal_weight: f64,
    pub orientation_weight: f64,
}

impl Default for ContinuityWeights {
    fn default() -> Self {
        Self {
            joint_weight: 1.0,
            distal_weight: 2.0,
            orientation_weight: 0.5,
        }
    }
}

/// Cost of moving from the previous waypoint to a candidate solution.
///
/// Weighted squared joint deltas over the actuated joints, plus the squared
/// geodesic angle between end-effector orientations when the previous one is
/// known.
pub fn continuity_cost(
    chain: &Chain,
    weights: &ContinuityWeights,
    previous: &ContinuityState,
    joints: &[f64],
    orientation: &UnitQuaternion<f64>,
) -> f64 {
    let last = chain.joints().len().saturating_sub(1);
    let joint_cost: f64 = chain
        .joints()
        .iter()
        .enumerate()
        .map(|(k, joint)| {
            let weight = if k == last { weights.distal_weight } else { weights.joint_weight };
            let delta = joints[joint.link] - previous.joints[joint.link];
            weight * delta * delta
        })
        .sum();

    let orientation_cost = previous.orientation.map_or(0.0, |prev| {
        let angle = geodesic_angle(&prev, orientation);
        weights.orientation_weight * angle * angle
    });

    joint_cost + orientation_cost
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorConfig {
    pub weights: ContinuityWeights,
    /// Largest position error a candidate may have and still count as reaching the pose
    pub acceptance_tolerance: f64,
    /// Solve with the pose orientation when it carries one
    pub constrain_orientation: bool,
    /// Pose evaluations a path solve may spend beyond one per pose while
    /// backing up from unreachable waypoints
    pub backtrack_budget: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            weights: ContinuityWeights::default(),
            acceptance_tolerance: 1e-3,
            constrain_orientation: false,
            backtrack_budget: 64,
        }
    }
}

/// What the selector remembers between waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityState {
    pub joints: JointVector,
    /// Unknown until the first pose is solved
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl ContinuityState {
    /// Zero seed, no orientation
    pub fn new(chain: &Chain) -> Self {
        Self {
            joints: chain.zero_joints(),
            orientation: None,
        }
    }

    /// State after `solved` was selected
    pub fn reached(solved: &SolvedPose) -> Self {
        Self {
            joints: solved.outcome.joints.clone(),
            orientation: Some(solved.outcome.orientation()),
        }
    }
}

/// A selected waypoint solution
#[derive(Debug, Clone)]
pub struct SolvedPose {
    pub outcome: SolveOutcome,
    /// Continuity cost against the state it was selected from
    pub cost: f64,
}

impl SolvedPose {
    pub fn joints(&self) -> &[f64] {
        &self.outcome.joints
    }

    pub fn frames(&self) -> &[Frame] {
        &self.outcome.frames
    }

    pub fn position_error(&self) -> f64 {
        self.outcome.position_error
    }
}

/// Stateful solver loop for one request
pub struct ContinuitySelector<'a> {
    chain: &'a Chain,
    solver: &'a dyn PoseSolver,
    strategy: Box<dyn CandidateStrategy + 'a>,
    config: SelectorConfig,
    state: ContinuityState,
}

impl<'a> ContinuitySelector<'a> {
    /// Selector seeded with zeros, using the default candidate strategy
    pub fn new(chain: &'a Chain, solver: &'a dyn PoseSolver) -> Self {
        Self {
            chain,
            solver,
            strategy: Box::new(PerturbationStrategy::default()),
            config: SelectorConfig::default(),
            state: ContinuityState::new(chain),
        }
    }

    pub fn with_strategy(mut self, strategy: impl CandidateStrategy + 'a) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn with_config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the continuity state, e.g. with the solution of the origin pose
    pub fn with_state(mut self, state: ContinuityState) -> Self {
        self.state = ContinuityState {
            joints: self.chain.normalize_joints(&state.joints),
            orientation: state.orientation,
        };
        self
    }

    pub fn state(&self) -> &ContinuityState {
        &self.state
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Solve one pose and advance the continuity state to the winner.
    pub fn select(&mut self, pose: &Pose) -> SolvedPose {
        let scored = self.score_candidates(&self.state, pose);
        let best = match pick_best(scored, self.config.acceptance_tolerance) {
            Some(best) => best,
            None => self.evaluate(&self.state, pose, &self.state.joints),
        };
        self.state = ContinuityState::reached(&best);
        best
    }

    fn score_candidates(&self, state: &ContinuityState, pose: &Pose) -> Vec<SolvedPose> {
        self.strategy
            .generate_candidates(self.chain, &state.joints)
            .iter()
            .map(|seed| self.evaluate(state, pose, seed))
            .collect()
    }

    fn evaluate(&self, state: &ContinuityState, pose: &Pose, seed: &[f64]) -> SolvedPose {
        let outcome = solve_pose(self.solver, self.chain, pose, seed, self.config.constrain_orientation);
        let cost = continuity_cost(self.chain, &self.config.weights, state, &outcome.joints, &outcome.orientation());
        debug!(
            "candidate pos_err={:.3e} cost={:.4} converged={}",
            outcome.position_error, cost, outcome.converged
        );
        SolvedPose { outcome, cost }
    }

    /// Distinct candidates that reach the pose, cheapest first
    fn reaching(&self, state: &ContinuityState, pose: &Pose) -> Vec<SolvedPose> {
        let tolerance = self.config.acceptance_tolerance;
        let mut options: Vec<SolvedPose> = self
            .score_candidates(state, pose)
            .into_iter()
            .filter(|s| s.outcome.within(tolerance))
            .collect();
        options.sort_by(|a, b| a.cost.total_cmp(&b.cost));

        let mut distinct: Vec<SolvedPose> = Vec::with_capacity(options.len());
        for option in options {
            if !distinct.iter().any(|kept| same_joints(&kept.outcome.joints, &option.outcome.joints)) {
                distinct.push(option);
            }
        }
        distinct
    }

    /// Solve a sequence of poses in order, each seeded by the previous one.
    ///
    /// Every pose takes its cheapest reaching candidate. When a pose has none,
    /// the search returns to the latest waypoint with another reaching
    /// candidate and continues from that one. If the budget runs out, or no
    /// combination reaches every pose, the poses are selected one by one as
    /// [`ContinuitySelector::select`] would.
    pub fn solve_path(&mut self, poses: &[Pose]) -> Vec<SolvedPose> {
        match self.search_path(poses) {
            Some(path) => {
                if let Some(last) = path.last() {
                    self.state = ContinuityState::reached(last);
                }
                path
            }
            None => {
                debug!("no path reaches all {} poses, selecting greedily", poses.len());
                poses.iter().map(|pose| self.select(pose)).collect()
            }
        }
    }

    fn search_path(&self, poses: &[Pose]) -> Option<Vec<SolvedPose>> {
        let budget = poses.len() + self.config.backtrack_budget;
        let mut evaluations = 0;
        // One entry per settled waypoint: its options and the one in use
        let mut stack: Vec<(Vec<SolvedPose>, usize)> = Vec::with_capacity(poses.len());

        while stack.len() < poses.len() {
            if evaluations >= budget {
                return None;
            }
            let state = match stack.last() {
                Some((options, k)) => ContinuityState::reached(&options[*k]),
                None => self.state.clone(),
            };
            let options = self.reaching(&state, &poses[stack.len()]);
            evaluations += 1;

            if !options.is_empty() {
                stack.push((options, 0));
                continue;
            }

            debug!("waypoint {} unreachable from the current branch, backing up", stack.len());
            loop {
                let (options, k) = stack.last_mut()?;
                *k += 1;
                if *k < options.len() {
                    break;
                }
                stack.pop();
            }
        }

        Some(stack.into_iter().map(|(mut options, k)| options.swap_remove(k)).collect())
    }
}

fn same_joints(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-6)
}

/// Lowest cost among the candidates that reach the pose, otherwise the
/// candidate that gets closest. Ties keep the earlier candidate.
fn pick_best(scored: Vec<SolvedPose>, tolerance: f64) -> Option<SolvedPose> {
    let (accepted, missed): (Vec<SolvedPose>, Vec<SolvedPose>) =
        scored.into_iter().partition(|s| s.outcome.within(tolerance));

    if accepted.is_empty() {
        missed
            .into_iter()
            .min_by(|a, b| a.outcome.position_error.total_cmp(&b.outcome.position_error))
    } else {
        accepted.into_iter().min_by(|a, b| a.cost.total_cmp(&b.cost))
    }
}
