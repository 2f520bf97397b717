//! Main waypoint updater executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Start the network:
//!         - Input client, receiving the base path, pose, velocity, traffic and obstacle inputs
//!         - Control server, serving reconfiguration and shutdown requests
//!         - Window server, publishing the windows
//!     - Wait for both a base path and a pose to be received
//!     - Main loop, once per tick:
//!         - Find the path point nearest the vehicle
//!         - Build the window ahead of it
//!         - Publish the window
//!     - Stop once shutdown is requested over the control channel

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};

// Internal
use comms_if::net::{zmq, NetParams};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};
use wp_lib::{
    control_server::ControlServer, input_client::InputClient, params::WpExecParams,
    scheduler::Scheduler, updater::UpdaterHandle, window_server::WindowServer,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("wp_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Waypoint Updater Executable\n");
    info!(
        "Software root: {:?}",
        host::get_wp_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let exec_params: WpExecParams =
        util::params::load("wp_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");
    info!("Initial configuration: {:?}", exec_params.config);

    // ---- INITIALISE UPDATER ----

    let handle = UpdaterHandle::new(exec_params.config);

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let mut input_client = {
        let c = InputClient::new(&zmq_ctx, &net_params, handle.clone())
            .wrap_err("Failed to initialise the InputClient")?;
        info!("InputClient initialised");
        c
    };

    let mut control_server = {
        let s = ControlServer::new(&zmq_ctx, &net_params, handle.clone())
            .wrap_err("Failed to initialise the ControlServer")?;
        info!("ControlServer initialised");
        s
    };

    let window_server = {
        let s = WindowServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the WindowServer")?;
        info!("WindowServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    let mut scheduler = Scheduler::new(handle.clone(), window_server, &exec_params.frame_id)
        .wrap_err("Failed to initialise the Scheduler")?;

    info!("Waiting for the base path and pose");

    let ready = scheduler.wait_until_ready();

    if ready.is_ok() {
        // Archive the path the windows are built from
        match handle.path_store().get() {
            Some(path) => session.save("base_path.json", (*path).clone()),
            None => warn!("No base path available to archive"),
        }

        info!("Begining main loop\n");

        scheduler.run_ticks();
    }

    // ---- SHUTDOWN ----

    input_client.stop();
    control_server.stop();

    session.exit();

    ready.wrap_err("The updater did not start")
}
