//! Cartesian trajectory interpolation between two end poses.
//!
//! Rigid-transform interpolation is consumed through [`MotionInterpolator`]
//! so hosts and tests can substitute their own. The default
//! [`ScrewInterpolator`] uses nalgebra's dual quaternion screw interpolation.

use std::sync::Arc;

use nalgebra::{Isometry3, Point3, UnitDualQuaternion, UnitQuaternion};
use tracing::{debug, warn};

use crate::errors::IkError;
use crate::pose::Pose;

/// How the interior of a trajectory is sampled
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSpec {
    /// Strictly increasing fractions in (0, 1)
    Fractions(Vec<f64>),
    /// Total pose count including both endpoints, greater than 1 and at
    /// most [`SampleSpec::MAX_STEPS`]
    Steps(usize),
}

impl SampleSpec {
    pub const DEFAULT_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];
    /// Largest total pose count a trajectory is sampled with
    pub const MAX_STEPS: usize = 10_000;

    /// Normalize a raw fraction list.
    ///
    /// Values outside the open interval (0, 1) are dropped, the rest sorted and
    /// deduplicated. An empty result falls back to the default fractions.
    pub fn fractions(raw: &[f64]) -> Self {
        let mut fractions: Vec<f64> = raw.iter().copied().filter(|f| *f > 0.0 && *f < 1.0).collect();
        fractions.sort_by(f64::total_cmp);
        fractions.dedup();

        if fractions.is_empty() {
            Self::default()
        } else {
            SampleSpec::Fractions(fractions)
        }
    }

    /// Step-count sampling, only valid for more than one step.
    ///
    /// Counts above [`SampleSpec::MAX_STEPS`] are clamped to it.
    pub fn steps(count: u64) -> Option<Self> {
        if count <= 1 {
            return None;
        }
        let capped = match usize::try_from(count) {
            Ok(n) if n <= Self::MAX_STEPS => n,
            _ => {
                warn!("step count {} exceeds {}; clamping", count, Self::MAX_STEPS);
                Self::MAX_STEPS
            }
        };
        Some(SampleSpec::Steps(capped))
    }

    /// Number of interior poses this spec produces
    pub fn interior_count(&self) -> usize {
        match self {
            SampleSpec::Fractions(fractions) => fractions.len(),
            SampleSpec::Steps(count) => (*count).min(Self::MAX_STEPS).saturating_sub(2),
        }
    }
}

impl Default for SampleSpec {
    fn default() -> Self {
        SampleSpec::Fractions(Self::DEFAULT_FRACTIONS.to_vec())
    }
}

/// Constant-velocity rigid-transform interpolation
pub trait MotionInterpolator: Send + Sync {
    /// Transform at parameter `t` in [0, 1] along the motion from `start` to `end`
    fn interpolate(&self, start: &Isometry3<f64>, end: &Isometry3<f64>, t: f64) -> Result<Isometry3<f64>, IkError>;
}

/// Screw-motion interpolation on unit dual quaternions
#[derive(Debug, Clone, Copy)]
pub struct ScrewInterpolator {
    pub epsilon: f64,
}

impl Default for ScrewInterpolator {
    fn default() -> Self {
        Self { epsilon: 1e-9 }
    }
}

impl MotionInterpolator for ScrewInterpolator {
    fn interpolate(&self, start: &Isometry3<f64>, end: &Isometry3<f64>, t: f64) -> Result<Isometry3<f64>, IkError> {
        let a = UnitDualQuaternion::from_isometry(start);
        let b = UnitDualQuaternion::from_isometry(end);
        a.try_sclerp(&b, t, self.epsilon)
            .map(|dq| dq.to_isometry())
            .ok_or_else(|| IkError::SolveFailed("screw axis undefined for a half-turn rotation".to_string()))
    }
}

/// Flip `target` onto the same hemisphere as `origin` so the rotation
/// between them takes the short way around.
pub fn shortest_arc(origin: &UnitQuaternion<f64>, target: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    if origin.coords.dot(&target.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-target.into_inner())
    } else {
        *target
    }
}

/// Produces the interior poses of a trajectory
#[derive(Clone)]
pub struct TrajectoryGenerator {
    interpolator: Option<Arc<dyn MotionInterpolator>>,
}

impl TrajectoryGenerator {
    pub fn new(interpolator: Arc<dyn MotionInterpolator>) -> Self {
        Self {
            interpolator: Some(interpolator),
        }
    }

    /// Generator with no rigid-transform interpolation. Only position-only
    /// fractional sampling is available.
    pub fn without_interpolator() -> Self {
        Self { interpolator: None }
    }

    pub fn has_interpolator(&self) -> bool {
        self.interpolator.is_some()
    }

    /// Interior poses from `origin` to `target`, both endpoints excluded.
    pub fn interpolate(&self, origin: &Pose, target: &Pose, spec: &SampleSpec) -> Result<Vec<Pose>, IkError> {
        match spec {
            SampleSpec::Steps(count) => {
                let count = (*count).min(SampleSpec::MAX_STEPS);
                let params: Vec<f64> = (1..count.saturating_sub(1)).map(|i| i as f64 / (count - 1) as f64).collect();
                self.screw_poses(origin, target, &params)
            }
            SampleSpec::Fractions(fractions) => {
                if origin.orientation.is_some() && target.orientation.is_some() {
                    self.screw_poses(origin, target, fractions)
                } else {
                    Ok(fractions.iter().map(|f| linear_pose(origin, target, *f)).collect())
                }
            }
        }
    }

    fn screw_poses(&self, origin: &Pose, target: &Pose, params: &[f64]) -> Result<Vec<Pose>, IkError> {
        let interpolator = self.interpolator.as_ref().ok_or_else(|| {
            IkError::CapabilityUnavailable("orientation interpolation is not available".to_string())
        })?;

        let start = origin.to_isometry();
        let mut end = target.to_isometry();
        end.rotation = shortest_arc(&start.rotation, &end.rotation);

        debug!("screw interpolation over {} samples", params.len());
        params
            .iter()
            .map(|t| interpolator.interpolate(&start, &end, *t).map(|iso| Pose::from_isometry(&iso)))
            .collect()
    }
}

impl Default for TrajectoryGenerator {
    fn default() -> Self {
        Self::new(Arc::new(ScrewInterpolator::default()))
    }
}

impl std::fmt::Debug for TrajectoryGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectoryGenerator")
            .field("interpolator", &self.interpolator.is_some())
            .finish()
    }
}

fn linear_pose(origin: &Pose, target: &Pose, fraction: f64) -> Pose {
    let position = origin.position.coords.lerp(&target.position.coords, fraction);
    Pose {
        position: Point3::from(position),
        orientation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::sync::Mutex;

    fn posed(position: [f64; 3], orientation: UnitQuaternion<f64>) -> Pose {
        Pose::from_position(position).with_orientation(orientation)
    }

    #[test]
    fn test_fraction_normalization() {
        let spec = SampleSpec::fractions(&[0.75, 0.25, 0.5, 0.25, 1.0, 0.0, -0.3, f64::NAN, 0.6]);
        assert_eq!(spec, SampleSpec::Fractions(vec![0.25, 0.5, 0.6, 0.75]));

        assert_eq!(SampleSpec::fractions(&[]), SampleSpec::default());
        assert_eq!(SampleSpec::fractions(&[2.0, -1.0]), SampleSpec::default());
    }

    #[test]
    fn test_steps_requires_more_than_one() {
        assert_eq!(SampleSpec::steps(0), None);
        assert_eq!(SampleSpec::steps(1), None);
        assert_eq!(SampleSpec::steps(2).map(|s| s.interior_count()), Some(0));
        assert_eq!(SampleSpec::steps(6).map(|s| s.interior_count()), Some(4));
        assert_eq!(SampleSpec::steps(1_000_000_000_000), Some(SampleSpec::Steps(SampleSpec::MAX_STEPS)));
        assert_eq!(SampleSpec::steps(u64::MAX).map(|s| s.interior_count()), Some(SampleSpec::MAX_STEPS - 2));
    }

    #[test]
    fn test_linear_fractions_are_ordered() {
        let generator = TrajectoryGenerator::without_interpolator();
        let origin = Pose::from_position([0.0, 10.0, 0.0]);
        let target = Pose::from_position([10.0, 10.0, 0.0]);

        let spec = SampleSpec::fractions(&[0.5, 0.1, 0.5]);
        let poses = generator.interpolate(&origin, &target, &spec).unwrap();

        assert_eq!(poses.len(), 2);
        assert!((poses[0].position.x - 1.0).abs() < 1e-12);
        assert!((poses[1].position.x - 5.0).abs() < 1e-12);
        assert!(poses.iter().all(|p| p.orientation.is_none()));
    }

    #[test]
    fn test_step_count_excludes_endpoints() {
        let generator = TrajectoryGenerator::default();
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4);
        let origin = posed([0.0, 10.0, 0.0], q);
        let target = posed([10.0, 10.0, 0.0], q);

        let poses = generator.interpolate(&origin, &target, &SampleSpec::Steps(6)).unwrap();
        assert_eq!(poses.len(), 4);

        let mut last_x = origin.position.x;
        for (i, pose) in poses.iter().enumerate() {
            let expected = 10.0 * (i + 1) as f64 / 5.0;
            assert!((pose.position.x - expected).abs() < 1e-9, "pose {} at x={}", i, pose.position.x);
            assert!((pose.position.y - 10.0).abs() < 1e-9);
            assert!(pose.position.x > last_x && pose.position.x < target.position.x);
            last_x = pose.position.x;

            let orientation = pose.orientation.unwrap();
            assert!(orientation.angle_to(&q) < 1e-9);
        }
    }

    #[test]
    fn test_screw_motion_rotates_at_constant_rate() {
        let generator = TrajectoryGenerator::default();
        let origin = posed([0.0, 0.0, 0.0], UnitQuaternion::identity());
        let target = posed([0.0, 4.0, 0.0], UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.2));

        let poses = generator.interpolate(&origin, &target, &SampleSpec::Steps(5)).unwrap();
        assert_eq!(poses.len(), 3);
        for (i, pose) in poses.iter().enumerate() {
            let expected = 1.2 * (i + 1) as f64 / 4.0;
            let angle = pose.orientation.unwrap().angle();
            assert!((angle - expected).abs() < 1e-9, "angle {} expected {}", angle, expected);
            // axis is along the translation, so the screw stays on the line
            assert!((pose.position.y - 4.0 * (i + 1) as f64 / 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_target_quaternion_is_sign_normalized() {
        struct Recording(Mutex<Vec<UnitQuaternion<f64>>>);
        impl MotionInterpolator for Recording {
            fn interpolate(
                &self,
                start: &Isometry3<f64>,
                end: &Isometry3<f64>,
                _t: f64,
            ) -> Result<Isometry3<f64>, IkError> {
                self.0.lock().unwrap().push(end.rotation);
                Ok(*start)
            }
        }

        let recorder = Arc::new(Recording(Mutex::new(Vec::new())));
        let generator = TrajectoryGenerator::new(recorder.clone());

        let origin_q = UnitQuaternion::identity();
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        let flipped = UnitQuaternion::new_unchecked(-rotation.into_inner());
        assert!(origin_q.coords.dot(&flipped.coords) < 0.0);

        let origin = posed([0.0, 0.0, 0.0], origin_q);
        let target = posed([1.0, 0.0, 0.0], flipped);
        generator.interpolate(&origin, &target, &SampleSpec::default()).unwrap();

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for q in seen.iter() {
            assert!(origin_q.coords.dot(&q.coords) > 0.0);
            assert!((q.coords - rotation.coords).norm() < 1e-12);
        }
    }

    #[test]
    fn test_missing_interpolator_is_an_error() {
        let generator = TrajectoryGenerator::without_interpolator();
        let origin = posed([0.0, 0.0, 0.0], UnitQuaternion::identity());
        let target = posed([1.0, 0.0, 0.0], UnitQuaternion::identity());

        let result = generator.interpolate(&origin, &target, &SampleSpec::Steps(4));
        assert!(matches!(result, Err(IkError::CapabilityUnavailable(_))));

        let result = generator.interpolate(&origin, &target, &SampleSpec::default());
        assert!(matches!(result, Err(IkError::CapabilityUnavailable(_))));
    }

    #[test]
    fn test_shortest_arc_keeps_aligned_quaternion() {
        let a = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        let b = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5);
        assert_eq!(shortest_arc(&a, &b), b);
    }
}
