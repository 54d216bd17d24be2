// World-space geometry for tile placement.
//
// Tiles live in a continuous, y-up, right-handed world. A tile's
// orientation is a single yaw angle about the vertical axis (tiles never
// pitch or roll), so a pose is a position plus a yaw. Overlap testing is
// axis-aligned: a tile's world bounding box is the AABB of its yaw-rotated
// footprint, and two tiles collide when those boxes interpenetrate by more
// than a small epsilon. Exact face abutment — which every connected pair
// has along its shared connector plane — does not count.
//
// The attachment rule lives here too: a new tile is posed so that its
// chosen connector coincides with the frontier tile's chosen connector
// while facing the opposite direction (180° flip), making the two openings
// meet.
//
// All math is hand-rolled f32; angles are radians. Positive yaw rotates
// +Z toward +X.
//
// See also: `catalog.rs` for the footprints and connector local poses fed
// into this math, `layout.rs` for the overlap queries built on `Aabb`.
//
// **Critical constraint: determinism.** Pure arithmetic only. Identical
// inputs must yield bit-identical poses on every platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interpenetration below this depth is treated as contact, not overlap.
/// Connected tiles abut exactly along their shared connector plane, and
/// pose chains accumulate error well below this threshold.
pub const CONTACT_EPSILON: f32 = 1e-3;

/// A position or extent in world space. Components are in world units.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldVec {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldVec {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    /// Rotate about the vertical (Y) axis by `yaw` radians.
    pub fn rotated_y(self, yaw: f32) -> Self {
        let (s, c) = yaw.sin_cos();
        Self::new(self.x * c + self.z * s, self.y, -self.x * s + self.z * c)
    }

    /// Componentwise approximate equality within `tol`.
    pub fn approx_eq(self, other: Self, tol: f32) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
    }
}

impl fmt::Display for WorldVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// A rigid placement in the world: position plus yaw about the vertical
/// axis, in radians.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: WorldVec,
    pub yaw: f32,
}

impl Pose {
    pub const fn new(position: WorldVec, yaw: f32) -> Self {
        Self { position, yaw }
    }

    /// Map a point from this pose's local frame into world space.
    pub fn transform_point(&self, local: WorldVec) -> WorldVec {
        self.position.add(local.rotated_y(self.yaw))
    }

    /// World pose of a feature (e.g. a connector) declared at a local
    /// position and local yaw within this pose's frame.
    pub fn compose(&self, local_position: WorldVec, local_yaw: f32) -> Pose {
        Pose::new(
            self.transform_point(local_position),
            normalize_yaw(self.yaw + local_yaw),
        )
    }
}

/// Normalize a yaw angle into `[0, 2π)`.
pub fn normalize_yaw(yaw: f32) -> f32 {
    const TAU: f32 = std::f32::consts::TAU;
    let y = yaw % TAU;
    if y < 0.0 { y + TAU } else { y }
}

/// Minimal signed difference `a - b`, in `(-π, π]`.
pub fn yaw_delta(a: f32, b: f32) -> f32 {
    const TAU: f32 = std::f32::consts::TAU;
    let mut d = normalize_yaw(a) - normalize_yaw(b);
    if d > std::f32::consts::PI {
        d -= TAU;
    } else if d <= -std::f32::consts::PI {
        d += TAU;
    }
    d
}

/// Pose a tile so that its connector — declared at `local_position` /
/// `local_yaw` in the tile's frame — lands exactly on `target` (the world
/// pose of the frontier tile's chosen connector) while facing the opposite
/// direction.
///
/// Two connectors mate when they occupy the same point with world yaws π
/// apart: each opening faces into the other tile.
pub fn attachment_pose(target: Pose, local_position: WorldVec, local_yaw: f32) -> Pose {
    let yaw = normalize_yaw(target.yaw + std::f32::consts::PI - local_yaw);
    let position = target.position.sub(local_position.rotated_y(yaw));
    Pose::new(position, yaw)
}

/// An axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: WorldVec,
    pub max: WorldVec,
}

impl Aabb {
    pub fn from_center_half_extents(center: WorldVec, half: WorldVec) -> Self {
        Self {
            min: center.sub(half),
            max: center.add(half),
        }
    }

    /// World AABB of a tile footprint under a pose.
    ///
    /// `extents` is the footprint's full size, `bounds_center` the local
    /// offset of its volume center from the tile origin. The box of a
    /// yaw-rotated footprint is bounded by the rotated-extents formula:
    /// `hx' = |hx·cos| + |hz·sin|` and symmetrically for z.
    pub fn of_footprint(pose: Pose, extents: WorldVec, bounds_center: WorldVec) -> Self {
        let center = pose.transform_point(bounds_center);
        let half = extents.scale(0.5);
        let (s, c) = pose.yaw.sin_cos();
        let world_half = WorldVec::new(
            (half.x * c).abs() + (half.z * s).abs(),
            half.y,
            (half.x * s).abs() + (half.z * c).abs(),
        );
        Self::from_center_half_extents(center, world_half)
    }

    pub fn center(&self) -> WorldVec {
        self.min.add(self.max).scale(0.5)
    }

    /// True when the boxes interpenetrate by more than `CONTACT_EPSILON`
    /// on every axis. Exact face/edge/corner contact is not an overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x + CONTACT_EPSILON < other.max.x
            && other.min.x + CONTACT_EPSILON < self.max.x
            && self.min.y + CONTACT_EPSILON < other.max.y
            && other.min.y + CONTACT_EPSILON < self.max.y
            && self.min.z + CONTACT_EPSILON < other.max.z
            && other.min.z + CONTACT_EPSILON < self.max.z
    }
}
