//! # Nearest Point Locator
//!
//! Finds the path point closest to the vehicle. Only planar (XY) distance is considered and every
//! point is checked on each call. The heading of the vehicle is not taken into account, so on a
//! path where two segments run close to each other the closest point may lie behind the vehicle
//! or on the other segment.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::wp::PathPoint;
use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Return the index of the point with the smallest planar distance to `position_m`.
///
/// Ties go to the lowest index. `None` is returned for an empty path.
pub fn nearest_index(points: &[PathPoint], position_m: &Vector3<f64>) -> Option<usize> {
    if points.is_empty() {
        return None;
    }

    let target = position_m.xy();

    let mut closest = 0;
    let mut closest_dist_m = std::f64::INFINITY;

    for (i, point) in points.iter().enumerate() {
        let dist_m = (point.pose.position2() - target).norm();

        // Strictly less than so the first of equally close points is kept
        if dist_m < closest_dist_m {
            closest = i;
            closest_dist_m = dist_m;
        }
    }

    Some(closest)
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

    #[test]
    fn test_nearest_index() {
        let path = square();

        assert_eq!(nearest_index(&path, &Vector3::new(0.9, 0.1, 0.0)), Some(1));
        assert_eq!(nearest_index(&path, &Vector3::new(0.1, 0.8, 0.0)), Some(3));
        assert_eq!(nearest_index(&path, &Vector3::new(5.0, 5.0, 0.0)), Some(2));
        assert_eq!(nearest_index(&[], &Vector3::new(0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_ignores_height() {
        let mut path = square();
        path[1].pose.position_m.z = 100.0;

        assert_eq!(nearest_index(&path, &Vector3::new(0.9, 0.1, 0.0)), Some(1));
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let path = square();

        // Equidistant from all four corners
        assert_eq!(nearest_index(&path, &Vector3::new(0.5, 0.5, 0.0)), Some(0));

        // Equidistant from points 1 and 2
        assert_eq!(nearest_index(&path, &Vector3::new(2.0, 0.5, 0.0)), Some(1));

        // Duplicate points
        let mut path = square();
        path.push(PathPoint::from_position(1.0, 0.0, 0.0));
        assert_eq!(nearest_index(&path, &Vector3::new(1.0, 0.0, 0.0)), Some(1));
    }

    #[test]
    fn test_no_closer_point() {
        // Points along a spiral, checked against a grid of positions
        let path: Vec<PathPoint> = (0..50)
            .map(|i| {
                let t = i as f64 * 0.3;
                PathPoint::from_position(t * t.cos(), t * t.sin(), 0.0)
            })
            .collect();

        for x in -10..10 {
            for y in -10..10 {
                let pos = Vector3::new(x as f64 * 1.3, y as f64 * 0.7, 0.0);
                let i = nearest_index(&path, &pos).unwrap();
                let best = (path[i].pose.position2() - pos.xy()).norm();

                for (j, p) in path.iter().enumerate() {
                    let d = (p.pose.position2() - pos.xy()).norm();
                    assert!(d >= best);
                    if d == best {
                        assert!(i <= j);
                    }
                }
            }
        }
    }
}
