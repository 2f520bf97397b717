//! # Waypoint Executable Parameters
//!
//! This module provides parameters for the waypoint updater executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{ctrl::Config, wp::DEFAULT_FRAME_ID};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpExecParams {
    /// Frame identifier attached to every published window
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Configuration in force until the first reconfiguration
    #[serde(default)]
    pub config: Config,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_frame_id() -> String {
    String::from(DEFAULT_FRAME_ID)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params() {
        let params: WpExecParams = util::params::from_str(
            r#"
            frame_id = "/map"

            [config]
            tick_rate_hz = 10.0
            window_length = 20
            default_speed_ms = 4.5
            "#,
        )
        .unwrap();
        assert_eq!(params.frame_id, "/map");
        assert_eq!(params.config.window_length, 20);

        // Everything defaults
        let params: WpExecParams = util::params::from_str("").unwrap();
        assert_eq!(params.frame_id, "/world");
        assert_eq!(params.config, Config::default());
    }
}
