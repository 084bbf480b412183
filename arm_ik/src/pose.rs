use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// Cartesian pose exchanged between the trajectory generator and the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3<f64>,
    /// Orientation, when one is known or commanded
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl Pose {
    pub fn from_position(position: [f64; 3]) -> Self {
        Self {
            position: Point3::new(position[0], position[1], position[2]),
            orientation: None,
        }
    }

    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation: Some(orientation),
        }
    }

    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Rigid transform of the pose, identity rotation when none is known.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.position.coords),
            self.orientation.unwrap_or_else(UnitQuaternion::identity),
        )
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            position: Point3::from(iso.translation.vector),
            orientation: Some(iso.rotation),
        }
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.position.coords
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }
}
