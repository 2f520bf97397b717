//! # Window Builder
//!
//! Builds the forward looking window of path points published on each tick. The window starts at
//! the point nearest the vehicle and runs forward along the path for the configured number of
//! points, wrapping past the end of the path back to its start since the path is a closed loop.
//!
//! Every point in the window has its target speed set to the configured default speed. Any speed
//! stored on the path itself is overwritten in the window (the path is never modified).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use chrono::Utc;
use comms_if::{
    ctrl::Config,
    wp::{PathPoint, PathWindow, Pose},
};
use log::debug;
use serde::Serialize;
use util::module::State;

use crate::{locator::nearest_index, path_store::Path};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Window builder module state
#[derive(Default)]
pub struct WindowBuilder {
    frame_id: Option<String>,

    report: StatusReport,
}

/// Input data to the window builder, a consistent set of the shared state for one tick.
pub struct InputData {
    pub path: Arc<Path>,

    pub pose: Pose,

    pub config: Arc<Config>,
}

/// Status report for window building.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatusReport {
    /// Path index of the first point in the window
    pub start_index: usize,

    /// Path index of the last point in the window
    pub end_index: usize,

    /// Planar distance from the vehicle to the first point in the window
    pub nearest_dist_m: f64,

    /// Length along the path covered by the window, `None` if the window is longer than the path
    /// or has fewer than one point
    pub window_length_m: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowBuilderError {
    #[error("The window frame identifier is empty")]
    EmptyFrameId,

    #[error("The window builder has not been initialised")]
    NotInit,

    #[error("Cannot build a window from an empty path")]
    EmptyPath,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for WindowBuilder {
    type InitData = String;
    type InitError = WindowBuilderError;

    type InputData = InputData;
    type OutputData = PathWindow;
    type StatusReport = StatusReport;
    type ProcError = WindowBuilderError;

    /// Initialise the builder with the frame identifier attached to every window.
    fn init(&mut self, frame_id: Self::InitData) -> Result<(), Self::InitError> {
        if frame_id.is_empty() {
            return Err(WindowBuilderError::EmptyFrameId);
        }

        self.frame_id = Some(frame_id);

        Ok(())
    }

    /// Build the window for the given path, pose and configuration.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let frame_id = self.frame_id.as_ref().ok_or(WindowBuilderError::NotInit)?;

        let points = input_data.path.points();

        let start = nearest_index(points, &input_data.pose.position_m)
            .ok_or(WindowBuilderError::EmptyPath)?;

        let window_points = build_window(
            points,
            start,
            input_data.config.window_length,
            input_data.config.default_speed_ms,
        );

        self.report = StatusReport {
            start_index: start,
            end_index: (start + window_points.len().saturating_sub(1)) % points.len(),
            nearest_dist_m: (points[start].pose.position2() - input_data.pose.position2()).norm(),
            window_length_m: window_arc_length_m(&input_data.path, start, window_points.len()),
        };

        debug!(
            "Window start = {}, end = {}, {} points",
            self.report.start_index,
            self.report.end_index,
            window_points.len()
        );

        Ok((
            PathWindow {
                frame_id: frame_id.clone(),
                timestamp: Utc::now(),
                points: window_points,
            },
            self.report,
        ))
    }
}

impl WindowBuilder {
    /// The report from the last successful processing cycle.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Copy `window_length` points of the path, starting at `start` and wrapping around the end of
/// the path, setting the speed of each copy to `default_speed_ms`.
///
/// If `window_length` is larger than the path the points repeat. An empty path gives an empty
/// window.
pub fn build_window(
    points: &[PathPoint],
    start: usize,
    window_length: usize,
    default_speed_ms: f64,
) -> Vec<PathPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    points
        .iter()
        .cycle()
        .skip(start % points.len())
        .take(window_length)
        .map(|p| PathPoint {
            speed_ms: default_speed_ms,
            ..*p
        })
        .collect()
}

/// Distance along the path covered by a window of `num_points` starting at `start`.
fn window_arc_length_m(path: &Path, start: usize, num_points: usize) -> Option<f64> {
    let len = path.len();

    if num_points == 0 || num_points > len || start >= len {
        return None;
    }

    let last = start + num_points - 1;

    if last < len {
        return path.distance_m(start, last);
    }

    // Window crosses the end of the path, so measure up to the last point, across the closing
    // segment, then on from the first point
    let points = path.points();
    let closing_m = (points[0].pose.position_m - points[len - 1].pose.position_m).norm();

    Some(path.distance_m(start, len - 1)? + closing_m + path.distance_m(0, last - len)?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> Vec<PathPoint> {
        vec![
            PathPoint::from_position(0.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 1.0, 0.0),
            PathPoint::from_position(0.0, 1.0, 0.0),
        ]
    }

    fn indices(path: &[PathPoint], window: &[PathPoint]) -> Vec<usize> {
        window
            .iter()
            .map(|w| {
                path.iter()
                    .position(|p| p.pose == w.pose)
                    .expect("window point not on path")
            })
            .collect()
    }

    #[test]
    fn test_build_window() {
        let mut path = square();
        path[2].speed_ms = 11.0;

        let window = build_window(&path, 1, 3, 5.0);
        assert_eq!(indices(&path, &window), vec![1, 2, 3]);
        assert!(window.iter().all(|p| p.speed_ms == 5.0));

        // The path itself is untouched
        assert_eq!(path[2].speed_ms, 11.0);
    }

    #[test]
    fn test_build_window_wraps() {
        let path = square();

        let window = build_window(&path, 3, 4, 0.0);
        assert_eq!(indices(&path, &window), vec![3, 0, 1, 2]);

        for n in 0..=path.len() {
            for start in 0..path.len() {
                let window = build_window(&path, start, n, 2.5);
                assert_eq!(window.len(), n);
                for (k, i) in indices(&path, &window).into_iter().enumerate() {
                    assert_eq!(i, (start + k) % path.len());
                }
            }
        }

        assert!(build_window(&[], 0, 3, 1.0).is_empty());
    }

    #[test]
    fn test_window_builder() {
        let path = Arc::new(Path::new(square()));
        let mut builder = WindowBuilder::default();

        let mut input = InputData {
            path: path.clone(),
            pose: Pose::from_position(0.9, 0.1, 0.0),
            config: Arc::new(Config {
                tick_rate_hz: 10.0,
                window_length: 3,
                default_speed_ms: 5.0,
            }),
        };

        assert_eq!(builder.proc(&input).err(), Some(WindowBuilderError::NotInit));
        assert_eq!(
            builder.init(String::new()),
            Err(WindowBuilderError::EmptyFrameId)
        );
        builder.init(String::from("/world")).unwrap();

        let (window, report) = builder.proc(&input).unwrap();
        assert_eq!(window.frame_id, "/world");
        assert_eq!(indices(path.points(), &window.points), vec![1, 2, 3]);
        assert!(window.points.iter().all(|p| p.speed_ms == 5.0));
        assert_eq!(report.start_index, 1);
        assert_eq!(report.end_index, 3);
        assert_eq!(report.window_length_m, Some(2.0));
        assert_eq!(builder.report(), &report);

        input.pose = Pose::from_position(0.1, 0.9, 0.0);
        input.config = Arc::new(Config {
            window_length: 4,
            ..*input.config
        });

        let (window, report) = builder.proc(&input).unwrap();
        assert_eq!(indices(path.points(), &window.points), vec![3, 0, 1, 2]);
        assert_eq!(report.end_index, 2);
        assert_eq!(report.window_length_m, Some(3.0));
    }

    #[test]
    fn test_window_arc_length() {
        let path = Path::new(square());

        assert_eq!(window_arc_length_m(&path, 0, 0), None);
        assert_eq!(window_arc_length_m(&path, 0, 1), Some(0.0));
        assert_eq!(window_arc_length_m(&path, 2, 3), Some(2.0));
        assert_eq!(window_arc_length_m(&path, 0, 5), None);
    }
}
