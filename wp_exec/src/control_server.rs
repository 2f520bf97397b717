//! # Control Server
//!
//! Serves the control channel of the updater. Clients send a JSON encoded [`ControlRequest`] and
//! receive a JSON encoded [`ControlResponse`] in reply. Every request gets exactly one reply, a
//! request which cannot be parsed is answered with [`ControlResponse::Invalid`].

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
    ctrl::{ControlRequest, ControlResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, error, info, warn};

use crate::updater::UpdaterHandle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the control socket, bounds how long the background thread takes to notice a
/// stop request.
const RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ControlServer {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ControlServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the response: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlServer {
    /// Bind the control server and start serving requests.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        handle: UpdaterHandle,
    ) -> Result<Self, ControlServerError> {
        let socket_options = SocketOptions {
            recv_timeout: RECV_TIMEOUT_MS,
            ..SocketOptions::server()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.control_endpoint)
            .map_err(ControlServerError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || bg_thread(socket, bg_run_clone, handle)));

        Ok(Self { bg_jh, bg_run })
    }

    /// Stop serving requests and wait for the background thread to finish.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("ControlServer background thread panicked");
            }
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Apply a control request to the updater and build the response.
pub fn handle_request(handle: &UpdaterHandle, request: ControlRequest) -> ControlResponse {
    match request {
        ControlRequest::Reconfigure(config) => {
            ControlResponse::Accepted(handle.reconfigure(config))
        }
        ControlRequest::Shutdown => {
            handle.request_shutdown();
            ControlResponse::ShuttingDown
        }
    }
}

/// Parse a raw request and build the response to it.
pub fn handle_message(handle: &UpdaterHandle, msg: &str) -> ControlResponse {
    match serde_json::from_str(msg) {
        Ok(request) => handle_request(handle, request),
        Err(e) => {
            warn!("Could not parse control request: {}", e);
            ControlResponse::Invalid
        }
    }
}

fn send_response(
    socket: &MonitoredSocket,
    response: &ControlResponse,
) -> Result<(), ControlServerError> {
    let response_str =
        serde_json::to_string(response).map_err(ControlServerError::SerializationError)?;

    socket
        .send(response_str.as_str(), 0)
        .map_err(ControlServerError::SendError)
}

/// Background thread, serves requests until stopped.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, handle: UpdaterHandle) {
    while run.load(Ordering::Relaxed) {
        let response = match socket.recv_string(0) {
            Ok(Ok(s)) => handle_message(&handle, &s),
            Ok(Err(_)) => {
                warn!("Non UTF-8 control request");
                ControlResponse::Invalid
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving control request: {:?}", e);
                break;
            }
        };

        debug!("Control response: {:?}", response);

        if let Err(e) = send_response(&socket, &response) {
            warn!("Could not respond to control request: {}", e);
        }

        if response == ControlResponse::ShuttingDown {
            info!("Control server stopping after shutdown request");
            break;
        }
    }

    debug!("ControlServer background thread stopped");
}
