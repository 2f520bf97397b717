//! # Updater Handle
//!
//! The shared state of the updater and the entry points used by the asynchronous producers (path,
//! pose, velocity, traffic, obstacle and control sources). The handle is cheap to clone and can
//! be given to as many producer threads as needed, the scheduler reads the same state through its
//! own clone.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use comms_if::{
    ctrl::Config,
    wp::{PathPoint, Pose, Velocity},
};
use log::{debug, info};

use crate::{
    path_store::{PathStore, PathStoreError},
    runtime_config::RuntimeConfig,
    speed_policy::{NoSpeedShaping, SpeedPolicy},
    vehicle_state::VehicleState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct UpdaterHandle {
    shared: Arc<Shared>,
}

struct Shared {
    path_store: PathStore,
    vehicle_state: VehicleState,
    runtime_config: RuntimeConfig,
    speed_policy: Mutex<Box<dyn SpeedPolicy>>,
    shutdown: AtomicBool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl UpdaterHandle {
    /// Create a new updater with the given initial configuration and no speed shaping.
    pub fn new(initial: Config) -> Self {
        Self::with_speed_policy(initial, Box::new(NoSpeedShaping))
    }

    pub fn with_speed_policy(initial: Config, speed_policy: Box<dyn SpeedPolicy>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path_store: PathStore::new(),
                vehicle_state: VehicleState::new(),
                runtime_config: RuntimeConfig::new(initial),
                speed_policy: Mutex::new(speed_policy),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    // ---- PATH ----

    /// Load the reference path, see [`PathStore::load`].
    pub fn load_path(&self, points: Vec<PathPoint>) -> Result<usize, PathStoreError> {
        self.shared.path_store.load(points)
    }

    /// Set the action that stops the path source, see [`PathStore::set_unsubscribe`].
    pub fn on_path_loaded<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.path_store.set_unsubscribe(action)
    }

    pub fn path_store(&self) -> &PathStore {
        &self.shared.path_store
    }

    // ---- VEHICLE STATE ----

    pub fn set_pose(&self, pose: Pose) {
        self.shared.vehicle_state.set_pose(pose)
    }

    pub fn set_velocity(&self, velocity: Velocity) {
        self.shared.vehicle_state.set_velocity(velocity)
    }

    pub fn vehicle_state(&self) -> &VehicleState {
        &self.shared.vehicle_state
    }

    // ---- CONFIGURATION ----

    /// Apply a reconfiguration, returning the accepted configuration.
    pub fn reconfigure(&self, config: Config) -> Config {
        self.shared.runtime_config.apply(config)
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.shared.runtime_config
    }

    // ---- TRAFFIC AND OBSTACLES ----

    pub fn traffic_waypoint(&self, index: i64) {
        debug!("Traffic waypoint: {}", index);
        self.speed_policy().traffic_waypoint(index)
    }

    pub fn obstacle_waypoint(&self, index: i64) {
        debug!("Obstacle waypoint: {}", index);
        self.speed_policy().obstacle_waypoint(index)
    }

    /// Pass a window through the speed policy.
    pub fn shape_window(&self, start_index: usize, points: &mut [PathPoint]) {
        self.speed_policy().shape(start_index, points)
    }

    // ---- SHUTDOWN ----

    /// Ask the scheduler to stop at the end of its current tick.
    pub fn request_shutdown(&self) {
        if !self.shared.shutdown.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
        }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    fn speed_policy(&self) -> std::sync::MutexGuard<'_, Box<dyn SpeedPolicy>> {
        self.shared
            .speed_policy
            .lock()
            .expect("UpdaterHandle: speed policy mutex poisoned")
    }
}
