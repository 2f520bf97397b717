//! # Input Client
//!
//! Receives the updater's inputs from their sources. All sources publish on a single endpoint,
//! each on its own topic:
//!
//! - `base_path` - the reference path, delivered once.
//! - `current_pose` - the vehicle pose.
//! - `current_velocity` - the vehicle velocity.
//! - `traffic_waypoint` - the path index of the next traffic stop line.
//! - `obstacle_waypoint` - the path index of the next obstacle.
//!
//! Messages are received on a background thread and applied to the updater's shared state as they
//! arrive. Once a path has been loaded the client unsubscribes from `base_path` so no further paths
//! are delivered.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    wp::{
        InputMsg, BASE_PATH_TOPIC, CURRENT_POSE_TOPIC, CURRENT_VELOCITY_TOPIC,
        OBSTACLE_WAYPOINT_TOPIC, TRAFFIC_WAYPOINT_TOPIC,
    },
};
use log::{debug, error, info, warn};

use crate::updater::UpdaterHandle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topics the client subscribes to.
const INPUT_TOPICS: [&str; 5] = [
    BASE_PATH_TOPIC,
    CURRENT_POSE_TOPIC,
    CURRENT_VELOCITY_TOPIC,
    TRAFFIC_WAYPOINT_TOPIC,
    OBSTACLE_WAYPOINT_TOPIC,
];

/// Receive timeout of the input socket, bounds how long the background thread takes to notice a
/// stop or unsubscribe request.
const RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct InputClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the {0} topic: {1}")]
    SubscribeError(&'static str, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new input client and start receiving.
    ///
    /// This function will not block until the sources connect.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        handle: UpdaterHandle,
    ) -> Result<Self, InputClientError> {
        let socket_options = SocketOptions {
            recv_timeout: RECV_TIMEOUT_MS,
            ..SocketOptions::client()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.input_endpoint)
            .map_err(InputClientError::SocketError)?;

        for &topic in INPUT_TOPICS.iter() {
            socket
                .set_subscribe(topic.as_bytes())
                .map_err(|e| InputClientError::SubscribeError(topic, e))?;
        }

        // The socket belongs to the background thread, so the unsubscribe is only flagged here
        let unsubscribe = Arc::new(AtomicBool::new(false));
        let unsubscribe_clone = unsubscribe.clone();
        handle.on_path_loaded(move || unsubscribe_clone.store(true, Ordering::Relaxed));

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, unsubscribe, handle)
        }));

        Ok(Self { bg_jh, bg_run })
    }

    /// Stop the background thread and wait for it to finish.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("InputClient background thread panicked");
            }
        }
    }
}

impl Drop for InputClient {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Apply a single input message to the updater.
pub fn dispatch(handle: &UpdaterHandle, msg: InputMsg) {
    match msg {
        InputMsg::BasePath(points) => match handle.load_path(points) {
            Ok(n) => info!("Base path of {} points received", n),
            Err(e) => debug!("Base path rejected: {}", e),
        },
        InputMsg::CurrentPose(pose) => handle.set_pose(pose),
        InputMsg::CurrentVelocity(velocity) => handle.set_velocity(velocity),
        InputMsg::TrafficWaypoint(index) => handle.traffic_waypoint(index),
        InputMsg::ObstacleWaypoint(index) => handle.obstacle_waypoint(index),
    }
}

/// Background thread, receives messages and applies them to the updater.
fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    unsubscribe: Arc<AtomicBool>,
    handle: UpdaterHandle,
) {
    let mut subscribed_to_path = true;

    while run.load(Ordering::Relaxed) {
        if subscribed_to_path && unsubscribe.load(Ordering::Relaxed) {
            match socket.set_unsubscribe(BASE_PATH_TOPIC.as_bytes()) {
                Ok(()) => info!("Unsubscribed from {}", BASE_PATH_TOPIC),
                Err(e) => warn!("Could not unsubscribe from {}: {}", BASE_PATH_TOPIC, e),
            }
            subscribed_to_path = false;
        }

        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message on the input socket");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving message on the input socket: {:?}", e);
                break;
            }
        };

        match InputMsg::from_message(&msg) {
            Ok(m) => dispatch(&handle, m),
            Err(e) => warn!("Could not parse input message: {}", e),
        }
    }

    debug!("InputClient background thread stopped");
}
