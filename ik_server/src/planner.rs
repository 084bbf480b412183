//! Request orchestration.
//!
//! A [`Planner`] owns the injected capabilities and turns one request into
//! one response. It keeps no state between requests: every call builds its
//! own chain and continuity selector.

use std::sync::Arc;

use arm_ik::{
    Chain, ContinuitySelector, DlsSolver, IkError, MotionInterpolator, Pose, PoseSolver, ScrewInterpolator,
    SolvedPose, TrajectoryGenerator,
};
use ik_common::{ErrorResponse, IkRequest, IkResponse, Waypoint};
use tracing::{debug, info, warn};

use crate::assembler;

/// Capabilities the planner consumes
#[derive(Clone)]
pub struct Capabilities {
    pub solver: Arc<dyn PoseSolver>,
    /// Required for trajectories; `None` rejects every request with an origin
    pub interpolator: Option<Arc<dyn MotionInterpolator>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            solver: Arc::new(DlsSolver::default()),
            interpolator: Some(Arc::new(ScrewInterpolator::default())),
        }
    }
}

#[derive(Clone, Default)]
pub struct Planner {
    capabilities: Capabilities,
}

impl Planner {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Parse and plan a raw JSON payload
    pub fn handle_payload(&self, payload: &str) -> Result<IkResponse, IkError> {
        let request = IkRequest::from_json(payload)?;
        self.plan(&request)
    }

    /// Plan a payload and render the reply line together with the process
    /// exit status (0 on success).
    pub fn respond(&self, payload: &str) -> (String, i32) {
        match self.handle_payload(payload) {
            Ok(response) => match serde_json::to_string(&response) {
                Ok(line) => (line, 0),
                Err(e) => {
                    let err = IkError::SolveFailed(e.to_string());
                    (error_line(&err), err.exit_code())
                }
            },
            Err(err) => {
                warn!("request failed: {}", err);
                (error_line(&err), err.exit_code())
            }
        }
    }

    pub fn plan(&self, request: &IkRequest) -> Result<IkResponse, IkError> {
        let chain = Chain::build(&request.config);
        let solver: &dyn PoseSolver = &*self.capabilities.solver;
        let mut selector = ContinuitySelector::new(&chain, solver);
        let target = Pose::from_position(request.target);

        info!(
            "planning target={:?} origin={:?} wrist={}",
            request.target,
            request.origin,
            chain.has_wrist()
        );

        let (intermediates, final_solution) = match request.origin {
            Some(origin) => {
                let interpolator = self.capabilities.interpolator.clone().ok_or_else(|| {
                    IkError::CapabilityUnavailable("orientation interpolation is not available".to_string())
                })?;

                // Seeds the continuity state; the origin itself is not reported
                let origin_solution = selector.select(&Pose::from_position(origin));
                let orientation = origin_solution.outcome.orientation();
                debug!("origin solved with pos_err={:.3e}", origin_solution.position_error());

                let start = Pose::from_position(origin).with_orientation(orientation);
                let end = target.with_orientation(orientation);
                let mut poses =
                    TrajectoryGenerator::new(interpolator).interpolate(&start, &end, &request.sample_spec())?;
                poses.push(end);

                // The target joins the path so a branch that cannot reach it is abandoned too
                let mut path = selector.solve_path(&poses);
                let final_solution = path
                    .pop()
                    .ok_or_else(|| IkError::SolveFailed("empty trajectory".to_string()))?;
                (path, final_solution)
            }
            None => (Vec::new(), selector.select(&target)),
        };

        let intermediates = intermediates
            .iter()
            .map(|solved| to_waypoint(&chain, solved))
            .collect::<Result<Vec<_>, _>>()?;
        let final_waypoint = to_waypoint(&chain, &final_solution)?;

        info!(
            "planned {} intermediates, effector error {:.3e}",
            intermediates.len(),
            final_solution.position_error()
        );
        Ok(IkResponse::new(intermediates, final_waypoint))
    }
}

fn to_waypoint(chain: &Chain, solved: &SolvedPose) -> Result<Waypoint, IkError> {
    if !solved.outcome.is_finite() {
        return Err(IkError::SolveFailed("solver returned non-finite joint values".to_string()));
    }
    let waypoint = assembler::waypoint_from_frames(chain, solved.joints(), solved.frames());
    if !assembler::is_finite(&waypoint) {
        return Err(IkError::SolveFailed("non-finite geometry in solved pose".to_string()));
    }
    Ok(waypoint)
}

/// Serialized `{error, details}` record
pub fn error_line(err: &IkError) -> String {
    serde_json::to_string(&ErrorResponse::from(err)).unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", err.code()))
}
