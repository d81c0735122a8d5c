//! Replicated entity types
//!
//! These are the shapes mirrored between clients by the transport layer.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::species::Species;
use crate::{GroupId, PathId, UserId};

/// A connected user's character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub user_id: UserId,
    /// Latest known position (input for local, network for remote)
    pub position: DVec2,
    pub direction: DVec2,
    #[serde(default)]
    pub species: Species,
}

impl Avatar {
    pub fn new(user_id: impl Into<UserId>, position: DVec2, direction: DVec2) -> Self {
        Self {
            user_id: user_id.into(),
            position,
            direction,
            species: Species::Other,
        }
    }
}

/// Logical phase of an NPC group
///
/// The captor only exists in the `Captured` variant, so a captor id without
/// the CAPTURED phase (or the reverse) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupPhase {
    /// Resting on the ground, free for anyone
    Idle,
    /// Moving along its Path
    Path,
    /// Following its captor
    Captured { captor_id: UserId },
}

/// A cluster of NPCs sharing one position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcGroup {
    pub id: GroupId,
    /// Member identities; the first member is the face of the group
    pub file_names: Vec<String>,
    #[serde(flatten)]
    pub phase: GroupPhase,
    pub position: DVec2,
    pub direction: DVec2,
}

impl NpcGroup {
    pub fn new(id: impl Into<GroupId>, file_names: Vec<String>, phase: GroupPhase) -> Self {
        Self {
            id: id.into(),
            file_names,
            phase,
            position: DVec2::ZERO,
            direction: DVec2::X,
        }
    }

    pub fn at(mut self, position: DVec2, direction: DVec2) -> Self {
        self.position = position;
        self.direction = direction;
        self
    }

    pub fn size(&self) -> usize {
        self.file_names.len()
    }

    /// A group with no members is logically deleted
    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty()
    }

    pub fn captor_id(&self) -> Option<&str> {
        match &self.phase {
            GroupPhase::Captured { captor_id } => Some(captor_id),
            _ => None,
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self.phase, GroupPhase::Captured { .. })
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase == GroupPhase::Path
    }

    /// Member used to pick the rendered icon
    pub fn face(&self) -> Option<&str> {
        self.file_names.first().map(String::as_str)
    }

    /// Remove and return the last `count` members (clamped to the group size)
    pub fn split_tail(&mut self, count: usize) -> Vec<String> {
        let keep = self.file_names.len().saturating_sub(count);
        self.file_names.split_off(keep)
    }
}

/// Why a group is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathPhase {
    /// Launched by a captor
    Thrown,
    /// Knocked loose from a captured group
    Fleeing,
    /// Deflected off something
    Bouncing,
    /// Heading back to its thrower
    Returning,
}

impl PathPhase {
    /// Phases that hit captured groups and other in-flight groups
    pub fn is_attacking(self) -> bool {
        matches!(self, PathPhase::Thrown | PathPhase::Returning)
    }
}

/// Closed-form straight-line flight of a PATH-phase group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub npc_group_id: GroupId,
    pub start_position: DVec2,
    /// Unit vector
    pub direction: DVec2,
    /// Units per second
    pub velocity: f64,
    /// Launch instant (ms)
    pub timestamp: f64,
    /// Flight length (ms)
    pub path_duration: f64,
    pub path_phase: PathPhase,
    /// User who launched the group (thrown/returning flights only)
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("cat_{i}.png")).collect()
    }

    #[test]
    fn test_split_tail_keeps_face() {
        let mut group = NpcGroup::new("g", names(4), GroupPhase::Idle);
        let tail = group.split_tail(3);
        assert_eq!(tail, vec!["cat_1.png", "cat_2.png", "cat_3.png"]);
        assert_eq!(group.face(), Some("cat_0.png"));
    }

    #[test]
    fn test_split_tail_clamps() {
        let mut group = NpcGroup::new("g", names(2), GroupPhase::Idle);
        assert_eq!(group.split_tail(10).len(), 2);
        assert!(group.is_empty());
    }

    #[test]
    fn test_captor_only_when_captured() {
        let captured = NpcGroup::new(
            "g",
            names(1),
            GroupPhase::Captured {
                captor_id: "alice".into(),
            },
        );
        assert_eq!(captured.captor_id(), Some("alice"));
        let idle = NpcGroup::new("h", names(1), GroupPhase::Idle);
        assert_eq!(idle.captor_id(), None);
    }

    #[test]
    fn test_group_wire_shape() {
        let group = NpcGroup::new(
            "g",
            names(1),
            GroupPhase::Captured {
                captor_id: "alice".into(),
            },
        );
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["phase"], "CAPTURED");
        assert_eq!(json["captor_id"], "alice");
        let back: NpcGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }
}
