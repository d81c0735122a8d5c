//! NPC Wrangle - replicated capture/collision core
//!
//! Core modules:
//! - `sim`: Deterministic entity replication, collision and resolution
//! - `tuning`: Shared gameplay parameters (must match on every client)

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::DVec2;

/// Identity of a connected user
pub type UserId = String;
/// Identity of an NPC group
pub type GroupId = String;
/// Identity of a path
pub type PathId = String;

/// Game configuration constants
pub mod consts {
    /// Prefix for the stable id of a user's captured group
    pub const CAPTURED_GROUP_PREFIX: &str = "captured:";
    /// Substituted for any missing field fed to the outcome hash
    pub const HASH_FIELD_FALLBACK: &str = "-";
    /// Directions shorter than this are treated as zero
    pub const MIN_DIRECTION_LENGTH: f64 = 1e-9;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Heading of a direction vector in radians
#[inline]
pub fn heading(direction: DVec2) -> f64 {
    direction.y.atan2(direction.x)
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(angle).rotate(v)
}

/// Unit vector, or `fallback` if `v` is (nearly) zero
#[inline]
pub fn unit_or(v: DVec2, fallback: DVec2) -> DVec2 {
    if v.length() < consts::MIN_DIRECTION_LENGTH {
        fallback
    } else {
        v.normalize()
    }
}

/// Stable id of the group captured by `user`
pub fn captured_group_id(user: &str) -> GroupId {
    format!("{}{}", consts::CAPTURED_GROUP_PREFIX, user)
}
