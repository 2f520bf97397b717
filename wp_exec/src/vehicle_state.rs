//! # Vehicle State
//!
//! Latest pose and velocity estimates of the vehicle. Updates overwrite the previous value, no
//! history is kept and no plausibility checks are made on the values.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;

use comms_if::wp::{Pose, Velocity};
use log::trace;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct VehicleState {
    pose: Mutex<Option<Pose>>,

    /// Not used in window computation
    velocity: Mutex<Option<Velocity>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pose(&self, pose: Pose) {
        trace!("Pose set to {:?}", pose.position_m);
        *self.pose.lock().expect("VehicleState: pose mutex poisoned") = Some(pose);
    }

    pub fn set_velocity(&self, velocity: Velocity) {
        *self
            .velocity
            .lock()
            .expect("VehicleState: velocity mutex poisoned") = Some(velocity);
    }

    pub fn has_pose(&self) -> bool {
        self.pose
            .lock()
            .expect("VehicleState: pose mutex poisoned")
            .is_some()
    }

    pub fn pose(&self) -> Option<Pose> {
        *self.pose.lock().expect("VehicleState: pose mutex poisoned")
    }

    pub fn velocity(&self) -> Option<Velocity> {
        *self
            .velocity
            .lock()
            .expect("VehicleState: velocity mutex poisoned")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_last_write_wins() {
        let state = VehicleState::new();
        assert!(!state.has_pose());
        assert!(state.velocity().is_none());

        state.set_pose(Pose::from_position(1.0, 2.0, 0.0));
        state.set_pose(Pose::from_position(3.0, 4.0, 0.0));
        assert!(state.has_pose());
        assert_eq!(state.pose().unwrap().position_m, Vector3::new(3.0, 4.0, 0.0));

        // Implausible values are stored as given
        state.set_pose(Pose::from_position(std::f64::NAN, 0.0, 0.0));
        assert!(state.pose().unwrap().position_m.x.is_nan());

        state.set_velocity(Velocity {
            linear_ms: Vector3::new(5.0, 0.0, 0.0),
            ..Default::default()
        });
        assert_eq!(state.velocity().unwrap().linear_ms.x, 5.0);
    }
}
