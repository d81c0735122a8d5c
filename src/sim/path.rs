//! Path kinematics and the live path map
//!
//! A path is a closed-form straight line. Position depends only on the
//! replicated fields and the evaluation instant, so every client (and the
//! server) lands on the same point once the flight is over.

use std::collections::BTreeMap;

use glam::DVec2;

use super::state::Path;
use crate::GroupId;

impl Path {
    /// Position along the path at `now` (ms)
    ///
    /// Past the end of the flight the distance is exactly
    /// `velocity * duration_secs`; this expression must stay identical to the
    /// server's so completed positions converge bit for bit.
    pub fn position_at(&self, now: f64) -> DVec2 {
        if self.is_complete(now) {
            return self.end_position();
        }
        let elapsed = (now - self.timestamp) / 1000.0;
        let dur_sec = self.path_duration / 1000.0;
        let progress = (elapsed / dur_sec).min(1.0);
        let distance = if progress >= 1.0 {
            self.velocity * dur_sec
        } else {
            self.velocity * elapsed
        };
        self.start_position + self.direction * distance
    }

    /// Final resting point of the flight
    pub fn end_position(&self) -> DVec2 {
        self.start_position + self.direction * (self.velocity * (self.path_duration / 1000.0))
    }

    /// Compared against the absolute end instant, not the elapsed time, so
    /// `timestamp + path_duration` itself always counts as complete
    pub fn is_complete(&self, now: f64) -> bool {
        now >= self.timestamp + self.path_duration
    }

    /// Milliseconds since launch (never negative)
    pub fn age(&self, now: f64) -> f64 {
        (now - self.timestamp).max(0.0)
    }
}

/// Live paths keyed by the group they move
///
/// At most one path per group; inserting replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct PathMap {
    paths: BTreeMap<GroupId, Path>,
}

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group_id: &str) -> Option<&Path> {
        self.paths.get(group_id)
    }

    /// Insert a path, returning the one it replaced
    pub fn insert(&mut self, path: Path) -> Option<Path> {
        self.paths.insert(path.npc_group_id.clone(), path)
    }

    /// Cancel the flight of a group
    pub fn remove(&mut self, group_id: &str) -> Option<Path> {
        self.paths.remove(group_id)
    }

    /// Remove by path id (inbound deletes carry the path id)
    pub fn remove_by_path_id(&mut self, path_id: &str) -> Option<Path> {
        let group_id = self
            .paths
            .values()
            .find(|p| p.id == path_id)
            .map(|p| p.npc_group_id.clone())?;
        self.paths.remove(&group_id)
    }

    /// Paths in group id order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
