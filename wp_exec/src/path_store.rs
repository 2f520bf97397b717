//! # Path Store
//!
//! Holds the reference path the vehicle follows. The path is delivered once by its source and is
//! immutable for the rest of the execution, any later delivery is reported and ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, RwLock};

use comms_if::wp::PathPoint;
use log::{error, info, warn};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered, closed loop reference path.
///
/// Points are identified by their index, and index arithmetic on the path wraps modulo its
/// length.
#[derive(Debug, Clone, Serialize)]
pub struct Path {
    points: Vec<PathPoint>,
}

/// Write-once store for the reference path.
pub struct PathStore {
    path: RwLock<Option<Arc<Path>>>,

    /// Action to stop the path source delivering more paths, run once after the first load.
    unsubscribe: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathStoreError {
    #[error("Attempted to load a path when {0} points have already been loaded")]
    AlreadyLoaded(usize),

    #[error("Attempted to load an empty path")]
    EmptyPath,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cumulative distance along the path between two point indices.
    ///
    /// This is the sum of the 3D lengths of every segment from `start` to `end`. Wrapping around
    /// the end of the path is not supported, so `None` is returned if `start > end` or if `end`
    /// is not a valid index.
    pub fn distance_m(&self, start: usize, end: usize) -> Option<f64> {
        if start > end || end >= self.points.len() {
            return None;
        }

        Some(
            self.points[start..=end]
                .windows(2)
                .map(|pair| (pair[1].pose.position_m - pair[0].pose.position_m).norm())
                .sum(),
        )
    }
}

impl PathStore {
    pub fn new() -> Self {
        Self {
            path: RwLock::new(None),
            unsubscribe: Mutex::new(None),
        }
    }

    /// Set the action which stops the path source delivering further paths.
    ///
    /// The action is run once, straight after the first successful load. If a path is already
    /// loaded it is run immediately.
    pub fn set_unsubscribe<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Holding the lock while checking the path means a concurrent load either sees this
        // action or has already finished with the slot
        let mut slot = self
            .unsubscribe
            .lock()
            .expect("PathStore: unsubscribe mutex poisoned");

        if self.is_loaded() {
            drop(slot);
            action();
            return;
        }

        *slot = Some(Box::new(action));
    }

    /// Load the reference path.
    ///
    /// Only the first non-empty path is accepted. A second load is reported and leaves the stored
    /// path untouched. On success the number of loaded points is returned.
    pub fn load(&self, points: Vec<PathPoint>) -> Result<usize, PathStoreError> {
        let num_points = {
            let mut path = self.path.write().expect("PathStore: path lock poisoned");

            if let Some(ref p) = *path {
                error!(
                    "Attempt to load a path when {} points have already been loaded",
                    p.len()
                );
                return Err(PathStoreError::AlreadyLoaded(p.len()));
            }

            if points.is_empty() {
                warn!("Attempt to load an empty path, ignored");
                return Err(PathStoreError::EmptyPath);
            }

            let num_points = points.len();
            *path = Some(Arc::new(Path::new(points)));
            num_points
        };

        info!("{} path points loaded", num_points);

        // Taken out of the mutex so the action only ever runs once
        let unsubscribe = self
            .unsubscribe
            .lock()
            .expect("PathStore: unsubscribe mutex poisoned")
            .take();

        if let Some(action) = unsubscribe {
            action();
            info!("Path source unsubscribed");
        }

        Ok(num_points)
    }

    pub fn is_loaded(&self) -> bool {
        self.path
            .read()
            .expect("PathStore: path lock poisoned")
            .is_some()
    }

    /// Get a read-only view of the path, if one is loaded.
    pub fn get(&self) -> Option<Arc<Path>> {
        self.path
            .read()
            .expect("PathStore: path lock poisoned")
            .clone()
    }
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn square() -> Vec<PathPoint> {
        vec![
            PathPoint::from_position(0.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 0.0, 0.0),
            PathPoint::from_position(1.0, 1.0, 0.0),
            PathPoint::from_position(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_duplicate_load() {
        let store = PathStore::new();
        assert!(!store.is_loaded());
        assert!(store.get().is_none());

        assert_eq!(store.load(square()), Ok(4));
        assert!(store.is_loaded());

        let second = vec![PathPoint::from_position(5.0, 5.0, 0.0)];
        assert_eq!(store.load(second), Err(PathStoreError::AlreadyLoaded(4)));

        let path = store.get().unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.points()[1].pose.position_m.x, 1.0);
    }

    #[test]
    fn test_empty_load() {
        let store = PathStore::new();
        assert_eq!(store.load(Vec::new()), Err(PathStoreError::EmptyPath));
        assert!(!store.is_loaded());
        assert_eq!(store.load(square()), Ok(4));
    }

    #[test]
    fn test_unsubscribe_once() {
        let store = PathStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        store.set_unsubscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // Rejected loads don't unsubscribe
        store.load(Vec::new()).ok();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.load(square()).unwrap();
        store.load(square()).ok();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Setting an action after the load runs it straight away
        let c = calls.clone();
        store.set_unsubscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_distance() {
        let mut points = square();
        points[2].pose.position_m.z = 2.0;
        let path = Path::new(points);

        assert_eq!(path.distance_m(0, 0), Some(0.0));
        assert_eq!(path.distance_m(0, 1), Some(1.0));
        assert_eq!(path.distance_m(1, 2), Some(5f64.sqrt()));
        assert_eq!(path.distance_m(2, 1), None);
        assert_eq!(path.distance_m(0, 4), None);

        // Distance is additive over consecutive ranges
        for (a, b, c) in [(0, 1, 3), (0, 2, 3), (1, 1, 2), (0, 0, 3)].iter() {
            let ab = path.distance_m(*a, *b).unwrap();
            let bc = path.distance_m(*b, *c).unwrap();
            let ac = path.distance_m(*a, *c).unwrap();
            assert!((ac - (ab + bc)).abs() < 1e-12);
        }
    }
}
