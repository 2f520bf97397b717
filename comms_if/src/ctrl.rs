//! # Control Channel
//!
//! Requests sent to the updater's control server, and the responses it sends back. The control
//! channel carries live reconfiguration of the updater's tunable parameters and the shutdown
//! request.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Live-tunable parameters of the updater.
///
/// No validation is performed on these values, a zero or negative tick rate for example is
/// accepted as is.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Rate at which windows are published
    pub tick_rate_hz: f64,

    /// Number of path points in each published window
    pub window_length: usize,

    /// Target speed assigned to every point in the window
    pub default_speed_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request made to the updater over the control channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ControlRequest {
    /// Replace the live configuration
    Reconfigure(Config),

    /// Stop the updater
    Shutdown,
}

/// The updater's response to a [`ControlRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ControlResponse {
    /// The configuration was applied, the accepted configuration is echoed back
    Accepted(Config),

    /// The updater will stop at the end of its current tick
    ShuttingDown,

    /// The request could not be parsed
    Invalid,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_hz: 3.0,
            window_length: 50,
            default_speed_ms: 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_json() {
        let req: ControlRequest = serde_json::from_str(
            r#"{"Reconfigure":{"tick_rate_hz":10.0,"window_length":20,"default_speed_ms":5.0}}"#,
        )
        .unwrap();

        assert_eq!(
            req,
            ControlRequest::Reconfigure(Config {
                tick_rate_hz: 10.0,
                window_length: 20,
                default_speed_ms: 5.0
            })
        );

        let req: ControlRequest = serde_json::from_str(r#""Shutdown""#).unwrap();
        assert_eq!(req, ControlRequest::Shutdown);
    }
}
