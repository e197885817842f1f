//! Travel animation as a pure function of elapsed time.
//!
//! A path of cell centres is smoothed into a chain of quadratic Bézier
//! segments, one per cell. Each segment starts at the midpoint of the edge
//! the unit entered through, bends through the cell centre, and ends at the
//! midpoint of the edge it leaves by; the first starts at the first centre and
//! the last ends at the final one. A renderer calls [`travel_pose`] every
//! frame with the time since the unit set off.

use crate::coords::WorldPos;

/// Segments per second.
pub const DEFAULT_TRAVEL_SPEED: f32 = 4.0;

/// Where a travelling unit is at some moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelPose {
    pub position: WorldPos,
    /// Degrees around the vertical axis, `0` facing +z.
    pub orientation: f32,
    /// Index into the path of the cell currently being crossed.
    pub segment: usize,
    pub finished: bool,
}

pub fn bezier_point(a: WorldPos, b: WorldPos, c: WorldPos, t: f32) -> WorldPos {
    let r = 1.0 - t;
    WorldPos::new(
        r * r * a.x + 2.0 * r * t * b.x + t * t * c.x,
        r * r * a.y + 2.0 * r * t * b.y + t * t * c.y,
        r * r * a.z + 2.0 * r * t * b.z + t * t * c.z,
    )
}

pub fn bezier_derivative(a: WorldPos, b: WorldPos, c: WorldPos, t: f32) -> WorldPos {
    let r = 1.0 - t;
    WorldPos::new(
        2.0 * (r * (b.x - a.x) + t * (c.x - b.x)),
        2.0 * (r * (b.y - a.y) + t * (c.y - b.y)),
        2.0 * (r * (b.z - a.z) + t * (c.z - b.z)),
    )
}

/// Heading in degrees from `from` towards `to` on the ground plane, or
/// `None` if they coincide.
pub fn orientation_towards(from: WorldPos, to: WorldPos) -> Option<f32> {
    heading(to.x - from.x, to.z - from.z)
}

fn heading(dx: f32, dz: f32) -> Option<f32> {
    if dx.abs() < 1e-6 && dz.abs() < 1e-6 {
        return None;
    }
    Some(dx.atan2(dz).to_degrees().rem_euclid(360.0))
}

fn segment_controls(points: &[WorldPos], segment: usize) -> (WorldPos, WorldPos, WorldPos) {
    let last = points.len() - 1;
    let mid = |i: usize| points[i].lerp(points[i + 1], 0.5);
    if segment >= last {
        let end = points[last];
        (mid(last - 1), end, end)
    } else {
        let start = if segment == 0 { points[0] } else { mid(segment - 1) };
        (start, points[segment], mid(segment))
    }
}

/// Pose along `points` after `elapsed` seconds at `speed` segments per
/// second. `None` for an empty path.
pub fn travel_pose(points: &[WorldPos], elapsed: f32, speed: f32) -> Option<TravelPose> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(TravelPose {
            position: first,
            orientation: 0.0,
            segment: 0,
            finished: true,
        });
    }

    let segments = points.len();
    let progress = (elapsed.max(0.0) * speed.max(0.0)).min(segments as f32);
    let finished = progress >= segments as f32;
    let (segment, t) = if finished {
        (segments - 1, 1.0)
    } else {
        let s = progress.floor() as usize;
        (s, progress - s as f32)
    };

    let (a, b, c) = segment_controls(points, segment);
    let d = bezier_derivative(a, b, c, t);
    let orientation = heading(d.x, d.z)
        .or_else(|| orientation_towards(a, c))
        .unwrap_or(0.0);

    Some(TravelPose {
        position: bezier_point(a, b, c, t),
        orientation,
        segment,
        finished,
    })
}

/// Seconds needed to cover a path of `cells` cells.
pub fn travel_duration(cells: usize, speed: f32) -> f32 {
    if cells < 2 || speed <= 0.0 {
        0.0
    } else {
        cells as f32 / speed
    }
}
