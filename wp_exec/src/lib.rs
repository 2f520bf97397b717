//! # Waypoint updater library.
//!
//! This library allows the executable, its tests and benchmarks, and other crates in the workspace
//! to access the items defined inside the waypoint updater crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control server - serves reconfiguration and shutdown requests
pub mod control_server;

/// Input client - receives the path, pose, velocity, traffic and obstacle inputs
pub mod input_client;

/// Nearest point locator - finds the path point closest to the vehicle
pub mod locator;

/// Executable parameters
pub mod params;

/// Path store - holds the write-once reference path
pub mod path_store;

/// Runtime configuration - live tunable parameters
pub mod runtime_config;

/// Scheduler - drives the periodic building and publishing of windows
pub mod scheduler;

/// Speed policy - hook for shaping the speeds of a window
pub mod speed_policy;

/// Updater handle - shared state and the entry points used by the inputs
pub mod updater;

/// Vehicle state - the latest pose and velocity of the vehicle
pub mod vehicle_state;

/// Window builder - builds the forward looking window of path points
pub mod window;

/// Window server - publishes the windows
pub mod window_server;
