//! # Window Server
//!
//! Publishes the windows built by the scheduler on the `final_waypoints` topic.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    wp::PathWindow,
};
use log::trace;

use crate::scheduler::{PublishError, WindowSink};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Window publisher
pub struct WindowServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WindowServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WindowServer {
    /// Create a new instance of the window server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, WindowServerError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions::server(),
            &params.window_endpoint,
        )
        .map_err(WindowServerError::SocketError)?;

        Ok(Self { socket })
    }
}

impl WindowSink for WindowServer {
    fn publish(&mut self, window: &PathWindow) -> Result<(), PublishError> {
        let msg = window
            .to_message()
            .map_err(PublishError::SerializationError)?;

        trace!("Publishing window of {} points", window.points.len());

        self.socket
            .send(msg.as_str(), 0)
            .map_err(PublishError::SendError)
    }
}
