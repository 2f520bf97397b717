//! # Speed Policy
//!
//! Extension point for shaping the target speeds in a window, for example slowing to a stop
//! before a red traffic light or an obstacle. Traffic and obstacle inputs are forwarded to the
//! policy as they arrive and the policy is given each window after the default speed has been
//! assigned.
//!
//! The default policy, [`NoSpeedShaping`], ignores all inputs and leaves windows unchanged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::wp::PathPoint;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait SpeedPolicy: Send {
    /// Index of the next path point affected by a traffic light, or a negative value if there is
    /// none.
    fn traffic_waypoint(&mut self, _index: i64) {}

    /// Index of the next path point affected by an obstacle, or a negative value if there is
    /// none.
    fn obstacle_waypoint(&mut self, _index: i64) {}

    /// Adjust the speeds of a window whose first point is at `start_index` in the path.
    fn shape(&self, _start_index: usize, _points: &mut [PathPoint]) {}
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed policy which leaves every window at the default speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeedShaping;

impl SpeedPolicy for NoSpeedShaping {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_no_speed_shaping() {
        let mut policy = NoSpeedShaping;
        let mut points = vec![PathPoint::from_position(1.0, 0.0, 0.0); 3];
        points.iter_mut().for_each(|p| p.speed_ms = 4.0);
        let before = points.clone();

        policy.traffic_waypoint(1);
        policy.obstacle_waypoint(-1);
        policy.shape(0, &mut points);

        assert_eq!(points, before);
    }
}
