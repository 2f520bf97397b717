//! # Waypoint Messages
//!
//! Data exchanged between the waypoint updater and its sources and consumers. Inputs arrive on a
//! single subscriber socket as topic-prefixed JSON strings (`"<topic> <json>"`), which allows a
//! subscriber to drop an individual topic (for example the base path once it has been loaded).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topic carrying the full reference path.
pub const BASE_PATH_TOPIC: &str = "base_path";

/// Topic carrying the vehicle's current pose.
pub const CURRENT_POSE_TOPIC: &str = "current_pose";

/// Topic carrying the vehicle's current velocity.
pub const CURRENT_VELOCITY_TOPIC: &str = "current_velocity";

/// Topic carrying the index of the next waypoint affected by a traffic light.
pub const TRAFFIC_WAYPOINT_TOPIC: &str = "traffic_waypoint";

/// Topic carrying the index of the next waypoint affected by an obstacle.
pub const OBSTACLE_WAYPOINT_TOPIC: &str = "obstacle_waypoint";

/// Topic on which path windows are published.
pub const FINAL_WAYPOINTS_TOPIC: &str = "final_waypoints";

/// Frame identifier attached to published windows unless configured otherwise.
pub const DEFAULT_FRAME_ID: &str = "/world";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position and attitude in the world frame.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Pose {
    /// The position in the world frame
    pub position_m: Vector3<f64>,

    /// The attitude in the world frame
    pub attitude_q: UnitQuaternion<f64>,
}

/// The current velocity of the vehicle.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Velocity {
    /// Linear velocity in the vehicle frame
    pub linear_ms: Vector3<f64>,

    /// Angular velocity in the vehicle frame
    pub angular_rads: Vector3<f64>,
}

/// A single point on the reference path.
///
/// A point's identity is its index in the path, the order of points defines the direction of
/// travel.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PathPoint {
    /// The pose of the point
    pub pose: Pose,

    /// Target speed at this point
    pub speed_ms: f64,
}

/// The forward looking section of the path published on each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathWindow {
    /// The frame the point poses are given in
    pub frame_id: String,

    /// UTC time at which the window was generated
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The points in the window, in path traversal order
    pub points: Vec<PathPoint>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A message delivered to the updater on the input socket.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMsg {
    BasePath(Vec<PathPoint>),
    CurrentPose(Pose),
    CurrentVelocity(Velocity),
    TrafficWaypoint(i64),
    ObstacleWaypoint(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum WpMsgError {
    #[error("Message has no topic separator")]
    NoTopic,

    #[error("Unknown topic \"{0}\"")]
    UnknownTopic(String),

    #[error("Could not deserialize the {0} payload: {1}")]
    DeserializeError(&'static str, serde_json::Error),

    #[error("Could not serialize the message: {0}")]
    SerializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    /// Create a pose at the given position with the identity attitude.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position_m: Vector3::new(x, y, z),
            attitude_q: UnitQuaternion::identity(),
        }
    }

    /// Return the position projected onto the XY plane.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }
}

impl PathPoint {
    /// Create a point at the given position with identity attitude and zero speed.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            pose: Pose::from_position(x, y, z),
            speed_ms: 0.0,
        }
    }
}

impl PathWindow {
    /// Serialize the window into a topic-prefixed message ready for publishing.
    pub fn to_message(&self) -> Result<String, WpMsgError> {
        let json = serde_json::to_string(self).map_err(WpMsgError::SerializeError)?;
        Ok(format!("{} {}", FINAL_WAYPOINTS_TOPIC, json))
    }

    /// Parse a window from a topic-prefixed message.
    pub fn from_message(msg: &str) -> Result<Self, WpMsgError> {
        let (topic, payload) = split_topic(msg)?;

        if topic != FINAL_WAYPOINTS_TOPIC {
            return Err(WpMsgError::UnknownTopic(topic.to_string()));
        }

        serde_json::from_str(payload)
            .map_err(|e| WpMsgError::DeserializeError(FINAL_WAYPOINTS_TOPIC, e))
    }
}

impl InputMsg {
    /// The topic this message is delivered on.
    pub fn topic(&self) -> &'static str {
        match self {
            InputMsg::BasePath(_) => BASE_PATH_TOPIC,
            InputMsg::CurrentPose(_) => CURRENT_POSE_TOPIC,
            InputMsg::CurrentVelocity(_) => CURRENT_VELOCITY_TOPIC,
            InputMsg::TrafficWaypoint(_) => TRAFFIC_WAYPOINT_TOPIC,
            InputMsg::ObstacleWaypoint(_) => OBSTACLE_WAYPOINT_TOPIC,
        }
    }

    /// Serialize the message into the `"<topic> <json>"` wire format.
    pub fn to_message(&self) -> Result<String, WpMsgError> {
        let json = match self {
            InputMsg::BasePath(p) => serde_json::to_string(p),
            InputMsg::CurrentPose(p) => serde_json::to_string(p),
            InputMsg::CurrentVelocity(v) => serde_json::to_string(v),
            InputMsg::TrafficWaypoint(i) | InputMsg::ObstacleWaypoint(i) => {
                serde_json::to_string(i)
            }
        }
        .map_err(WpMsgError::SerializeError)?;

        Ok(format!("{} {}", self.topic(), json))
    }

    /// Parse a message from the `"<topic> <json>"` wire format.
    pub fn from_message(msg: &str) -> Result<Self, WpMsgError> {
        let (topic, payload) = split_topic(msg)?;

        match topic {
            BASE_PATH_TOPIC => serde_json::from_str(payload)
                .map(InputMsg::BasePath)
                .map_err(|e| WpMsgError::DeserializeError(BASE_PATH_TOPIC, e)),
            CURRENT_POSE_TOPIC => serde_json::from_str(payload)
                .map(InputMsg::CurrentPose)
                .map_err(|e| WpMsgError::DeserializeError(CURRENT_POSE_TOPIC, e)),
            CURRENT_VELOCITY_TOPIC => serde_json::from_str(payload)
                .map(InputMsg::CurrentVelocity)
                .map_err(|e| WpMsgError::DeserializeError(CURRENT_VELOCITY_TOPIC, e)),
            TRAFFIC_WAYPOINT_TOPIC => serde_json::from_str(payload)
                .map(InputMsg::TrafficWaypoint)
                .map_err(|e| WpMsgError::DeserializeError(TRAFFIC_WAYPOINT_TOPIC, e)),
            OBSTACLE_WAYPOINT_TOPIC => serde_json::from_str(payload)
                .map(InputMsg::ObstacleWaypoint)
                .map_err(|e| WpMsgError::DeserializeError(OBSTACLE_WAYPOINT_TOPIC, e)),
            t => Err(WpMsgError::UnknownTopic(t.to_string())),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Split a message into its topic and payload.
fn split_topic(msg: &str) -> Result<(&str, &str), WpMsgError> {
    let mut parts = msg.splitn(2, ' ');

    match (parts.next(), parts.next()) {
        (Some(topic), Some(payload)) => Ok((topic, payload)),
        _ => Err(WpMsgError::NoTopic),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_input_msg_pose() {
        let msg = InputMsg::CurrentPose(Pose::from_position(0.5, 0.25, 0.0))
            .to_message()
            .unwrap();

        assert!(msg.starts_with("current_pose {"));

        match InputMsg::from_message(&msg).unwrap() {
            InputMsg::CurrentPose(p) => {
                assert_eq!(p.position_m, Vector3::new(0.5, 0.25, 0.0));
            }
            m => panic!("Expected a pose, got {:?}", m),
        }
    }

    #[test]
    fn test_input_msg_errors() {
        assert!(matches!(
            InputMsg::from_message("current_pose"),
            Err(WpMsgError::NoTopic)
        ));
        assert!(matches!(
            InputMsg::from_message("red_light 12"),
            Err(WpMsgError::UnknownTopic(_))
        ));
        assert!(matches!(
            InputMsg::from_message("traffic_waypoint twelve"),
            Err(WpMsgError::DeserializeError(TRAFFIC_WAYPOINT_TOPIC, _))
        ));
        assert_eq!(
            InputMsg::from_message("obstacle_waypoint -1").unwrap(),
            InputMsg::ObstacleWaypoint(-1)
        );
    }

    #[test]
    fn test_window_message_topic() {
        let window = PathWindow {
            frame_id: String::from(DEFAULT_FRAME_ID),
            timestamp: Utc::now(),
            points: vec![PathPoint::from_position(1.0, 0.0, 0.0)],
        };

        let msg = window.to_message().unwrap();
        assert!(msg.starts_with("final_waypoints "));

        let parsed = PathWindow::from_message(&msg).unwrap();
        assert_eq!(parsed.frame_id, "/world");
        assert_eq!(parsed.points.len(), 1);
        assert!(PathWindow::from_message("base_path []").is_err());
    }
}
