//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the waypoint updater and the systems that
//! talk to it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control channel requests and responses (reconfiguration and shutdown)
pub mod ctrl;

/// Network module
pub mod net;

/// Waypoint data: path points, poses, velocities and published windows
pub mod wp;
