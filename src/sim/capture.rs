//! Capture and throw
//!
//! Capture moves a free (or self-thrown) group into the mover's captured
//! group; throw splits members off the captured group into a new flight.

use thiserror::Error;

use super::events::InteractionKind;
use super::path::PathMap;
use super::registry::Registry;
use super::resolution::Resolution;
use super::state::{Avatar, GroupPhase, NpcGroup, Path, PathPhase};
use crate::tuning::Tuning;
use crate::{GroupId, PathId, captured_group_id, unit_or};

/// Why a throw could not start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrowError {
    #[error("user {0} has no captured group")]
    NothingCaptured(String),
    #[error("throw count must be at least 1")]
    ZeroCount,
}

/// Guard key for `mover` touching `group_id`
pub fn capture_key(mover: &str, group_id: &str) -> String {
    format!("capture:{mover}:{group_id}")
}

/// Whether `mover` may take `group` right now
///
/// A PATH-phase group with no known path is skipped for this frame.
pub fn can_capture(mover: &str, group: &NpcGroup, path: Option<&Path>, now: f64, tuning: &Tuning) -> bool {
    match &group.phase {
        GroupPhase::Captured { .. } => false,
        GroupPhase::Idle => true,
        GroupPhase::Path => {
            let Some(path) = path else {
                return false;
            };
            let age = path.age(now);
            let own = path.owner_id.as_deref() == Some(mover);
            match path.path_phase {
                PathPhase::Returning => true,
                PathPhase::Thrown => !own || age >= tuning.throw_recapture_cooldown_ms,
                PathPhase::Fleeing => age >= tuning.flee_recapture_cooldown_ms,
                PathPhase::Bouncing => age >= tuning.bounce_recapture_cooldown_ms,
            }
        }
    }
}

/// Merge `donor_id` into the captor's group
///
/// The merged group keeps the captor's stable id; the donor and its path are
/// removed in the same resolution.
pub fn resolve_capture(
    registry: &Registry,
    paths: &PathMap,
    captor: &Avatar,
    donor_id: &str,
    now: f64,
    tuning: &Tuning,
) -> Option<Resolution> {
    let donor = registry.get_by_group_id(donor_id)?;
    let path = paths.get(donor_id);
    if !can_capture(&captor.user_id, donor, path, now, tuning) {
        return None;
    }

    let mut resolution = Resolution::new();
    if let Some(path) = path {
        resolution.cancel_path(path);
    }

    let merged = match registry.get_by_captor_id(&captor.user_id) {
        Some(existing) => {
            let mut merged = existing.clone();
            merged.file_names.extend(donor.file_names.iter().cloned());
            merged
        }
        None => NpcGroup::new(
            captured_group_id(&captor.user_id),
            donor.file_names.clone(),
            GroupPhase::Captured {
                captor_id: captor.user_id.clone(),
            },
        )
        .at(captor.position, captor.direction),
    };

    if merged.id != donor.id {
        resolution.delete_group(donor.id.clone());
    }
    log::info!(
        "{} captured {} ({} members, now {})",
        captor.user_id,
        donor.id,
        donor.size(),
        merged.size()
    );
    resolution.put_group(merged);
    resolution.interaction(InteractionKind::Capture, &capture_key(&captor.user_id, donor_id));
    Some(resolution)
}

/// Throw the last `count` members of the captor's group along its heading
pub fn throw(
    registry: &Registry,
    captor: &Avatar,
    count: usize,
    ids: (GroupId, PathId),
    now: f64,
    tuning: &Tuning,
) -> Result<Resolution, ThrowError> {
    if count == 0 {
        return Err(ThrowError::ZeroCount);
    }
    let source = registry
        .get_by_captor_id(&captor.user_id)
        .ok_or_else(|| ThrowError::NothingCaptured(captor.user_id.clone()))?;

    let (group_id, path_id) = ids;
    let direction = unit_or(captor.direction, glam::DVec2::X);

    let mut remaining = source.clone();
    let thrown_members = remaining.split_tail(count);
    let thrown = NpcGroup::new(group_id.clone(), thrown_members, GroupPhase::Path)
        .at(captor.position, direction);
    let path = Path {
        id: path_id,
        npc_group_id: group_id,
        start_position: captor.position,
        direction,
        velocity: tuning.throw_velocity,
        timestamp: now,
        path_duration: tuning.throw_duration_ms,
        path_phase: PathPhase::Thrown,
        owner_id: Some(captor.user_id.clone()),
    };

    log::info!(
        "{} threw {} of {} members as {}",
        captor.user_id,
        thrown.size(),
        source.size(),
        thrown.id
    );

    let mut resolution = Resolution::new();
    resolution.put_group(remaining);
    resolution.put_group(thrown);
    resolution.create_path(path);
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn members(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}_{i}.png")).collect()
    }

    fn alice() -> Avatar {
        Avatar::new("alice", DVec2::ZERO, DVec2::X)
    }

    fn in_flight(group_id: &str, phase: PathPhase, owner: Option<&str>, timestamp: f64) -> Path {
        Path {
            id: format!("path-{group_id}"),
            npc_group_id: group_id.into(),
            start_position: DVec2::ZERO,
            direction: DVec2::X,
            velocity: 5.0,
            timestamp,
            path_duration: 1000.0,
            path_phase: phase,
            owner_id: owner.map(str::to_owned),
        }
    }

    fn apply(registry: &mut Registry, paths: &mut PathMap, resolution: Resolution) {
        registry.commit(resolution.changes);
        for group_id in resolution.cancelled_paths {
            paths.remove(&group_id);
        }
        for path in resolution.new_paths {
            paths.insert(path);
        }
    }

    #[test]
    fn test_capture_merges_into_existing_group() {
        let tuning = Tuning::default();
        let mut registry = Registry::new();
        let mut paths = PathMap::new();
        let own_id = captured_group_id("alice");
        registry.set_by_group_id(
            &own_id,
            NpcGroup::new(
                own_id.clone(),
                members("cat", 3),
                GroupPhase::Captured {
                    captor_id: "alice".into(),
                },
            ),
        );
        registry.set_by_group_id("free", NpcGroup::new("free", members("dog", 2), GroupPhase::Idle));

        let resolution = resolve_capture(&registry, &paths, &alice(), "free", 0.0, &tuning).unwrap();
        apply(&mut registry, &mut paths, resolution);

        let merged = registry.get_by_captor_id("alice").unwrap();
        assert_eq!(merged.id, own_id);
        assert_eq!(merged.size(), 5);
        assert_eq!(merged.face(), Some("cat_0.png"));
        assert!(registry.get_by_group_id("free").is_none());
    }

    #[test]
    fn test_first_capture_creates_stable_group() {
        let tuning = Tuning::default();
        let mut registry = Registry::new();
        registry.set_by_group_id("free", NpcGroup::new("free", members("dog", 2), GroupPhase::Idle));
        let paths = PathMap::new();

        let first = resolve_capture(&registry, &paths, &alice(), "free", 0.0, &tuning).unwrap();
        let again = resolve_capture(&registry, &paths, &alice(), "free", 0.0, &tuning).unwrap();
        assert_eq!(first, again);
        assert!(first.touched_groups().any(|id| id == captured_group_id("alice")));
    }

    #[test]
    fn test_capture_cancels_path() {
        let tuning = Tuning::default();
        let mut registry = Registry::new();
        let mut paths = PathMap::new();
        registry.set_by_group_id("fly", NpcGroup::new("fly", members("bird", 1), GroupPhase::Path));
        paths.insert(in_flight("fly", PathPhase::Thrown, Some("bob"), 0.0));

        let resolution = resolve_capture(&registry, &paths, &alice(), "fly", 10.0, &tuning).unwrap();
        apply(&mut registry, &mut paths, resolution);
        assert!(paths.get("fly").is_none());
        assert_eq!(registry.get_by_captor_id("alice").map(|g| g.size()), Some(1));
    }

    #[test]
    fn test_self_recapture_cooldown() {
        let tuning = Tuning::default();
        let group = NpcGroup::new("fly", members("cat", 1), GroupPhase::Path);
        let thrown = in_flight("fly", PathPhase::Thrown, Some("alice"), 1000.0);
        assert!(!can_capture("alice", &group, Some(&thrown), 1100.0, &tuning));
        assert!(can_capture("bob", &group, Some(&thrown), 1100.0, &tuning));
        assert!(can_capture("alice", &group, Some(&thrown), 1600.0, &tuning));

        let returning = in_flight("fly", PathPhase::Returning, Some("alice"), 1000.0);
        assert!(can_capture("alice", &group, Some(&returning), 1001.0, &tuning));
    }

    #[test]
    fn test_fleeing_cooldown_applies_to_everyone() {
        let tuning = Tuning::default();
        let group = NpcGroup::new("fly", members("cat", 1), GroupPhase::Path);
        let fleeing = in_flight("fly", PathPhase::Fleeing, None, 0.0);
        assert!(!can_capture("alice", &group, Some(&fleeing), 500.0, &tuning));
        assert!(can_capture("alice", &group, Some(&fleeing), 900.0, &tuning));
    }

    #[test]
    fn test_path_group_without_path_is_skipped() {
        let tuning = Tuning::default();
        let group = NpcGroup::new("fly", members("cat", 1), GroupPhase::Path);
        assert!(!can_capture("alice", &group, None, 0.0, &tuning));
    }

    #[test]
    fn test_captured_groups_cannot_be_captured() {
        let tuning = Tuning::default();
        let group = NpcGroup::new(
            "g",
            members("cat", 1),
            GroupPhase::Captured {
                captor_id: "bob".into(),
            },
        );
        assert!(!can_capture("alice", &group, None, 0.0, &tuning));
    }

    #[test]
    fn test_throw_splits_group() {
        let tuning = Tuning::default();
        let mut registry = Registry::new();
        let mut paths = PathMap::new();
        let own_id = captured_group_id("alice");
        registry.set_by_group_id(
            &own_id,
            NpcGroup::new(
                own_id.clone(),
                members("cat", 4),
                GroupPhase::Captured {
                    captor_id: "alice".into(),
                },
            ),
        );

        let resolution = throw(&registry, &alice(), 2, ("t1".into(), "tp1".into()), 0.0, &tuning).unwrap();
        apply(&mut registry, &mut paths, resolution);

        assert_eq!(registry.get_by_captor_id("alice").map(|g| g.size()), Some(2));
        let thrown = registry.get_by_group_id("t1").unwrap();
        assert_eq!(thrown.size(), 2);
        assert_eq!(thrown.phase, GroupPhase::Path);
        let path = paths.get("t1").unwrap();
        assert_eq!(path.direction, DVec2::X);
        assert_eq!(path.path_phase, PathPhase::Thrown);
        assert_eq!(path.owner_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_throw_everything_deletes_captor_group() {
        let tuning = Tuning::default();
        let mut registry = Registry::new();
        let own_id = captured_group_id("alice");
        registry.set_by_group_id(
            &own_id,
            NpcGroup::new(
                own_id.clone(),
                members("cat", 2),
                GroupPhase::Captured {
                    captor_id: "alice".into(),
                },
            ),
        );
        let resolution = throw(&registry, &alice(), 5, ("t".into(), "p".into()), 0.0, &tuning).unwrap();
        registry.commit(resolution.changes);
        assert!(registry.get_by_captor_id("alice").is_none());
        assert_eq!(registry.get_by_group_id("t").map(|g| g.size()), Some(2));
    }

    #[test]
    fn test_throw_errors() {
        let tuning = Tuning::default();
        let registry = Registry::new();
        assert_eq!(
            throw(&registry, &alice(), 0, ("t".into(), "p".into()), 0.0, &tuning).unwrap_err(),
            ThrowError::ZeroCount
        );
        assert!(matches!(
            throw(&registry, &alice(), 1, ("t".into(), "p".into()), 0.0, &tuning),
            Err(ThrowError::NothingCaptured(_))
        ));
    }
}
