//! Window listener
//!
//! Subscribes to the updater's window endpoint and prints a summary of every window received.
//! Useful for checking an updater on the bench without any downstream consumers running.

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    wp::{PathWindow, FINAL_WAYPOINTS_TOPIC},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "window_listener",
    about = "Print windows published by the waypoint updater"
)]
struct Opt {
    /// Endpoint the updater publishes windows on
    #[structopt(default_value = "tcp://localhost:5003")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        SocketOptions {
            block_on_first_connect: false,
            ..Default::default()
        },
        &opt.endpoint,
    )?;

    socket.set_subscribe(FINAL_WAYPOINTS_TOPIC.as_bytes())?;

    println!("Listening for windows on {}", opt.endpoint);

    loop {
        let msg = match socket.recv_string(0)? {
            Ok(s) => s,
            Err(_) => {
                println!("Got non UTF-8 message");
                continue;
            }
        };

        match PathWindow::from_message(&msg) {
            Ok(w) => {
                let first = w.points.first().map(|p| p.pose.position_m);
                println!(
                    "[{}] {}: {} points, first at {:?}, speed {:?} m/s",
                    w.timestamp,
                    w.frame_id,
                    w.points.len(),
                    first.map(|p| (p.x, p.y, p.z)),
                    w.points.first().map(|p| p.speed_ms)
                );
            }
            Err(e) => println!("Could not parse window: {}", e),
        }
    }
}
