//! # Scheduler
//!
//! Drives the periodic publishing of windows. The scheduler runs through the states:
//!
//! ```text
//! WaitingForPath -> WaitingForPose -> Running -> Stopped
//! ```
//!
//! While waiting it polls the shared state once per tick period. Once running, each tick takes a
//! snapshot of the shared state, builds the window, passes it through the speed policy and
//! publishes it to the sink, then sleeps for the rest of the tick period. Shutdown is cooperative,
//! the flag is checked once per tick and an in-progress tick always completes.
//!
//! The tick period comes from the scheduler's own copy of the configuration. At the start of each
//! tick the copy is compared against the latest configuration and the period recomputed if the
//! tick rate changed, so a new rate applies from the next wait onwards and never cuts short a
//! wait that has already started.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{mpsc::Sender, Arc},
    thread,
    time::{Duration, Instant},
};

use comms_if::{
    ctrl::Config,
    net::zmq,
    wp::{PathWindow, WpMsgError},
};
use log::{debug, error, info, warn};
use util::{module::State, time::period_from_hz};

use crate::{
    runtime_config::ConfigChanges,
    updater::UpdaterHandle,
    window::{InputData, WindowBuilder, WindowBuilderError},
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination for published windows.
pub trait WindowSink {
    fn publish(&mut self, window: &PathWindow) -> Result<(), PublishError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Scheduler<S: WindowSink> {
    handle: UpdaterHandle,
    sink: S,
    builder: WindowBuilder,

    state: SchedulerState,

    /// The configuration the current tick period was computed from
    config: Arc<Config>,
    period: Duration,

    /// Number of ticks executed since entering `Running`
    num_ticks: u64,

    /// Number of consecutive ticks which took longer than the tick period
    num_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    WaitingForPath,
    WaitingForPose,
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Shutdown was requested while in the {0:?} state")]
    ShutdownDuringStartup(SchedulerState),

    #[error("A tick rate of {0} Hz does not give a valid tick period")]
    InvalidTickRate(f64),

    #[error("Could not initialise the window builder: {0}")]
    WindowBuilderInitError(WindowBuilderError),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Could not serialize the window: {0}")]
    SerializationError(WpMsgError),

    #[error("Could not send the window: {0}")]
    SendError(zmq::Error),

    #[error("The window sink has been closed")]
    SinkClosed,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: WindowSink> Scheduler<S> {
    /// Create a new scheduler publishing windows tagged with `frame_id` into `sink`.
    ///
    /// The initial tick rate must give a valid period.
    pub fn new(handle: UpdaterHandle, sink: S, frame_id: &str) -> Result<Self, SchedulerError> {
        let config = handle.runtime_config().snapshot();

        let period = period_from_hz(config.tick_rate_hz)
            .ok_or(SchedulerError::InvalidTickRate(config.tick_rate_hz))?;

        let mut builder = WindowBuilder::default();
        builder
            .init(String::from(frame_id))
            .map_err(SchedulerError::WindowBuilderInitError)?;

        Ok(Self {
            handle,
            sink,
            builder,
            state: SchedulerState::WaitingForPath,
            config,
            period,
            num_ticks: 0,
            num_consec_overruns: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The period of the next wait.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    /// Run the scheduler until shutdown is requested.
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        self.wait_until_ready()?;
        self.run_ticks();
        Ok(())
    }

    /// Block until both a path and a pose are available.
    ///
    /// If shutdown is requested while waiting the scheduler stops and an error is returned.
    pub fn wait_until_ready(&mut self) -> Result<(), SchedulerError> {
        loop {
            self.update_startup_state();

            if self.state == SchedulerState::Running {
                info!("Path and pose available, scheduler running");
                return Ok(());
            }

            if self.handle.shutdown_requested() {
                let state = self.state;
                error!("Shutdown requested while in the {:?} state", state);
                self.state = SchedulerState::Stopped;
                return Err(SchedulerError::ShutdownDuringStartup(state));
            }

            self.refresh_config();
            thread::sleep(self.period);
        }
    }

    /// Run ticks until shutdown is requested.
    ///
    /// Must be called after [`Scheduler::wait_until_ready`].
    pub fn run_ticks(&mut self) {
        while !self.handle.shutdown_requested() {
            let sleep = self.step();
            thread::sleep(sleep);
        }

        self.state = SchedulerState::Stopped;
        info!("Scheduler stopped after {} ticks", self.num_ticks);
    }

    /// Execute one tick and return how long to wait before the next one.
    pub fn step(&mut self) -> Duration {
        let tick_start = Instant::now();

        self.tick();

        let tick_dur = tick_start.elapsed();

        match self.period.checked_sub(tick_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                d
            }
            None => {
                self.num_consec_overruns += 1;
                warn!(
                    "Tick overran by {:.06} s ({} consecutive overruns)",
                    (tick_dur - self.period).as_secs_f64(),
                    self.num_consec_overruns
                );
                Duration::from_secs(0)
            }
        }
    }

    /// Execute one tick, returning the published window if one was built.
    pub fn tick(&mut self) -> Option<PathWindow> {
        self.refresh_config();
        self.num_ticks += 1;

        let path = self.handle.path_store().get()?;
        let pose = self.handle.vehicle_state().pose()?;

        let input = InputData {
            path,
            pose,
            config: self.config.clone(),
        };

        let (mut window, report) = match self.builder.proc(&input) {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not build window: {}", e);
                return None;
            }
        };

        self.handle.shape_window(report.start_index, &mut window.points);

        if let Err(e) = self.sink.publish(&window) {
            warn!("Could not publish window: {}", e);
        }

        Some(window)
    }

    /// Take the latest configuration, recomputing the tick period if the tick rate changed.
    fn refresh_config(&mut self) {
        let latest = self.handle.runtime_config().snapshot();

        let changes = ConfigChanges::between(&self.config, &latest);

        if changes.any() {
            debug!("Configuration changed: {:?}", changes);
        }

        if changes.tick_rate {
            match period_from_hz(latest.tick_rate_hz) {
                Some(p) => {
                    debug!("Tick period changed from {:?} to {:?}", self.period, p);
                    self.period = p;
                }
                None => warn!(
                    "Tick rate of {} Hz does not give a valid period, keeping {:?}",
                    latest.tick_rate_hz, self.period
                ),
            }
        }

        self.config = latest;
    }

    fn update_startup_state(&mut self) {
        let path_loaded = self.handle.path_store().is_loaded();
        let has_pose = self.handle.vehicle_state().has_pose();

        // Path is waited for first, then the pose
        let next = match (path_loaded, has_pose) {
            (false, _) => SchedulerState::WaitingForPath,
            (true, false) => SchedulerState::WaitingForPose,
            (true, true) => SchedulerState::Running,
        };

        if next != self.state {
            debug!("Scheduler state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl WindowSink for Sender<PathWindow> {
    fn publish(&mut self, window: &PathWindow) -> Result<(), PublishError> {
        self.send(window.clone()).map_err(|_| PublishError::SinkClosed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::wp::{PathPoint, Pose};
    use std::sync::mpsc::{channel, Receiver};

    fn square() -> Vec<PathPoint> {
        vec![
            PathPoint::from_position(0.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 1.0, 0.0),
            PathPoint::from_position(0.0, 1.0, 0.0),
        ]
    }

    fn scheduler(
        config: Config,
    ) -> (
        UpdaterHandle,
        Scheduler<Sender<PathWindow>>,
        Receiver<PathWindow>,
    ) {
        let handle = UpdaterHandle::new(config);
        let (tx, rx) = channel();
        let sched = Scheduler::new(handle.clone(), tx, "/world").unwrap();
        (handle, sched, rx)
    }

    #[test]
    fn test_tick_publishes() {
        let (handle, mut sched, rx) = scheduler(Config {
            tick_rate_hz: 10.0,
            window_length: 3,
            default_speed_ms: 5.0,
        });

        // Nothing is published without a path and pose
        assert!(sched.tick().is_none());
        handle.load_path(square()).unwrap();
        assert!(sched.tick().is_none());
        assert!(rx.try_recv().is_err());

        handle.set_pose(Pose::from_position(0.9, 0.1, 0.0));
        let window = sched.tick().unwrap();
        assert_eq!(rx.try_recv().unwrap(), window);

        let xy: Vec<(f64, f64)> = window
            .points
            .iter()
            .map(|p| (p.pose.position_m.x, p.pose.position_m.y))
            .collect();
        assert_eq!(xy, vec![(1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(window.points.iter().all(|p| p.speed_ms == 5.0));
        assert_eq!(window.frame_id, "/world");
    }

    #[test]
    fn test_reconfigure_next_tick() {
        let (handle, mut sched, _rx) = scheduler(Config {
            tick_rate_hz: 10.0,
            window_length: 3,
            default_speed_ms: 5.0,
        });
        handle.load_path(square()).unwrap();
        handle.set_pose(Pose::from_position(0.1, 0.9, 0.0));

        assert_eq!(sched.tick().unwrap().points.len(), 3);

        handle.reconfigure(Config {
            tick_rate_hz: 10.0,
            window_length: 4,
            default_speed_ms: 1.0,
        });

        let window = sched.tick().unwrap();
        let xy: Vec<(f64, f64)> = window
            .points
            .iter()
            .map(|p| (p.pose.position_m.x, p.pose.position_m.y))
            .collect();
        assert_eq!(xy, vec![(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert!(window.points.iter().all(|p| p.speed_ms == 1.0));
    }

    #[test]
    fn test_tick_rate_change_applies_to_next_wait() {
        let (handle, mut sched, _rx) = scheduler(Config {
            tick_rate_hz: 10.0,
            ..Config::default()
        });
        assert_eq!(sched.period(), Duration::from_millis(100));

        // The wait returned before the change keeps the old period
        let wait = sched.step();
        assert!(wait <= Duration::from_millis(100));
        assert!(wait > Duration::from_millis(50));

        handle.reconfigure(Config {
            tick_rate_hz: 100.0,
            ..Config::default()
        });
        assert_eq!(sched.period(), Duration::from_millis(100));

        let wait = sched.step();
        assert_eq!(sched.period(), Duration::from_millis(10));
        assert!(wait <= Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_tick_rate() {
        let (handle, mut sched, _rx) = scheduler(Config {
            tick_rate_hz: 10.0,
            ..Config::default()
        });

        handle.reconfigure(Config {
            tick_rate_hz: 0.0,
            ..Config::default()
        });
        sched.step();
        assert_eq!(sched.period(), Duration::from_millis(100));

        // Changing back to a valid rate is picked up
        handle.reconfigure(Config {
            tick_rate_hz: 20.0,
            ..Config::default()
        });
        sched.step();
        assert_eq!(sched.period(), Duration::from_millis(50));

        let handle = UpdaterHandle::new(Config {
            tick_rate_hz: -1.0,
            ..Config::default()
        });
        let (tx, _rx) = channel();
        assert!(matches!(
            Scheduler::new(handle, tx, "/world"),
            Err(SchedulerError::InvalidTickRate(_))
        ));
    }

    #[test]
    fn test_startup_states() {
        let (handle, mut sched, _rx) = scheduler(Config {
            tick_rate_hz: 1000.0,
            ..Config::default()
        });
        assert_eq!(sched.state(), SchedulerState::WaitingForPath);

        // Pose alone doesn't get past waiting for the path
        handle.set_pose(Pose::from_position(0.0, 0.0, 0.0));
        sched.update_startup_state();
        assert_eq!(sched.state(), SchedulerState::WaitingForPath);

        // A rate change before the path arrives is picked up by the startup wait
        handle.reconfigure(Config {
            tick_rate_hz: 500.0,
            ..Config::default()
        });
        assert_eq!(sched.period(), Duration::from_millis(1));

        let loader = handle.clone();
        let loader_jh = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            loader.load_path(square()).unwrap();
        });

        sched.wait_until_ready().unwrap();
        loader_jh.join().unwrap();
        assert_eq!(sched.state(), SchedulerState::Running);
        assert_eq!(sched.period(), Duration::from_millis(2));

        handle.request_shutdown();
        sched.run_ticks();
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert_eq!(sched.num_ticks(), 0);
    }

    #[test]
    fn test_shutdown_during_startup() {
        let (handle, mut sched, _rx) = scheduler(Config {
            tick_rate_hz: 1000.0,
            ..Config::default()
        });
        handle.load_path(square()).unwrap();
        handle.request_shutdown();

        assert!(matches!(
            sched.run(),
            Err(SchedulerError::ShutdownDuringStartup(
                SchedulerState::WaitingForPose
            ))
        ));
        assert_eq!(sched.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_closed_sink_is_not_fatal() {
        let (handle, mut sched, rx) = scheduler(Config {
            tick_rate_hz: 10.0,
            window_length: 2,
            default_speed_ms: 1.0,
        });
        drop(rx);
        handle.load_path(square()).unwrap();
        handle.set_pose(Pose::from_position(0.0, 0.0, 0.0));

        assert_eq!(sched.tick().unwrap().points.len(), 2);
        assert_eq!(sched.tick().unwrap().points.len(), 2);
    }
}
