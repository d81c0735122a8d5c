//! Reflection, emission and in-flight clashes
//!
//! Every client runs these for every in-flight group, so all randomness comes
//! from [`OutcomeSeed`] and all spawned ids are derived from it.

use std::f64::consts::PI;

use glam::DVec2;

use super::events::InteractionKind;
use super::outcome::OutcomeSeed;
use super::path::PathMap;
use super::registry::Registry;
use super::resolution::Resolution;
use super::state::{GroupPhase, NpcGroup, Path, PathPhase};
use crate::tuning::Tuning;
use crate::{rotate, unit_or};

/// Guard key for an attacking path hitting a captured group
pub fn reflection_key(path_id: &str, defender_id: &str) -> String {
    format!("reflect:{path_id}:{defender_id}")
}

/// Guard key for two in-flight groups meeting (order independent)
pub fn clash_key(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("clash:{lo}:{hi}")
}

/// Offset of the `index`-th of `count` directions spread evenly over `arc`
pub fn fan_angle(index: usize, count: usize, arc: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    -arc / 2.0 + arc * index as f64 / (count - 1) as f64
}

/// Direction away from `obstacle`, perturbed by the shared hash
fn bounce_direction(from: DVec2, obstacle: DVec2, incoming: DVec2, seed: &OutcomeSeed, tuning: &Tuning) -> DVec2 {
    let away = unit_or(from - obstacle, -unit_or(incoming, DVec2::X));
    rotate(away, seed.value() * PI * tuning.bounce_perturbation)
}

fn bounce_path(group_id: &str, from: DVec2, direction: DVec2, seed: &OutcomeSeed, now: f64, tuning: &Tuning) -> Path {
    Path {
        id: seed.derive_id("bounce", 0),
        npc_group_id: group_id.to_owned(),
        start_position: from,
        direction,
        velocity: tuning.bounce_velocity,
        timestamp: now,
        path_duration: tuning.bounce_duration_ms,
        path_phase: PathPhase::Bouncing,
        owner_id: None,
    }
}

/// In-flight group with an attacking path, as seen at `now`
fn attacker<'a>(registry: &'a Registry, paths: &'a PathMap, group_id: &str) -> Option<(&'a NpcGroup, &'a Path)> {
    let group = registry.get_by_group_id(group_id)?;
    let path = paths.get(group_id)?;
    (group.is_in_flight() && path.path_phase.is_attacking()).then_some((group, path))
}

/// A thrown or returning group hits a captured group
///
/// The attacker bounces off; the defender releases as many members as the
/// attacker carries, each fleeing on its own path across a fan centered on
/// the impact direction.
pub fn resolve_reflection(
    registry: &Registry,
    paths: &PathMap,
    attacker_id: &str,
    defender_id: &str,
    now: f64,
    tuning: &Tuning,
) -> Option<Resolution> {
    let (group, path) = attacker(registry, paths, attacker_id)?;
    let defender = registry.get_by_group_id(defender_id)?;
    let captor = defender.captor_id()?;
    if path.owner_id.as_deref() == Some(captor) {
        return None;
    }

    let seed = OutcomeSeed {
        path_id: Some(path.id.as_str()),
        attacker_group_id: Some(group.id.as_str()),
        defender_group_id: Some(defender.id.as_str()),
        captor_id: Some(captor),
        launch_timestamp: Some(path.timestamp),
    };

    let mut resolution = Resolution::new();

    let hit_at = path.position_at(now);
    let direction = bounce_direction(hit_at, defender.position, path.direction, &seed, tuning);
    resolution.cancel_path(path);
    resolution.create_path(bounce_path(&group.id, hit_at, direction, &seed, now, tuning));
    resolution.put_group(group.clone().at(hit_at, direction));

    let impact = unit_or(path.direction, DVec2::X);
    let mut remaining = defender.clone();
    let released = remaining.split_tail(group.size().min(defender.size()));
    let count = released.len();
    for (index, member) in released.into_iter().enumerate() {
        let direction = rotate(impact, fan_angle(index, count, tuning.emission_arc()));
        let id = seed.derive_id("flee", index);
        resolution.put_group(
            NpcGroup::new(id.clone(), vec![member], GroupPhase::Path).at(defender.position, direction),
        );
        resolution.create_path(Path {
            id: seed.derive_id("flee-path", index),
            npc_group_id: id,
            start_position: defender.position,
            direction,
            velocity: tuning.flee_velocity,
            timestamp: now,
            path_duration: tuning.flee_duration_ms,
            path_phase: PathPhase::Fleeing,
            owner_id: None,
        });
    }

    log::info!(
        "{} bounced off {}; {} members knocked loose ({} left)",
        group.id,
        defender.id,
        count,
        remaining.size()
    );
    resolution.put_group(remaining);
    resolution.interaction(InteractionKind::Reflection, &reflection_key(&path.id, &defender.id));
    Some(resolution)
}

/// Two attacking groups meet in flight
///
/// Equal sizes both bounce away from each other; otherwise the larger
/// absorbs the smaller and keeps flying. Groups launched by the same player
/// never clash.
pub fn resolve_clash(
    registry: &Registry,
    paths: &PathMap,
    a_id: &str,
    b_id: &str,
    now: f64,
    tuning: &Tuning,
) -> Option<Resolution> {
    if a_id == b_id {
        return None;
    }
    let a = attacker(registry, paths, a_id)?;
    let b = attacker(registry, paths, b_id)?;
    if a.1.owner_id.is_some() && a.1.owner_id == b.1.owner_id {
        return None;
    }
    let key = clash_key(a_id, b_id);
    let mut resolution = Resolution::new();

    if a.0.size() == b.0.size() {
        for ((group, path), (other, other_path)) in [(a, b), (b, a)] {
            let seed = OutcomeSeed {
                path_id: Some(path.id.as_str()),
                attacker_group_id: Some(group.id.as_str()),
                defender_group_id: Some(other.id.as_str()),
                captor_id: path.owner_id.as_deref(),
                launch_timestamp: Some(path.timestamp),
            };
            let from = path.position_at(now);
            let direction = bounce_direction(from, other_path.position_at(now), path.direction, &seed, tuning);
            resolution.cancel_path(path);
            resolution.create_path(bounce_path(&group.id, from, direction, &seed, now, tuning));
            resolution.put_group(group.clone().at(from, direction));
        }
        log::info!("{} and {} clashed evenly and bounced", a_id, b_id);
    } else {
        let ((winner, winner_path), (loser, loser_path)) = if a.0.size() > b.0.size() { (a, b) } else { (b, a) };
        let mut merged = winner.clone();
        merged.file_names.extend(loser.file_names.iter().cloned());
        merged.position = winner_path.position_at(now);
        log::info!("{} absorbed {} in flight", winner.id, loser.id);
        resolution.cancel_path(loser_path);
        resolution.delete_group(loser.id.clone());
        resolution.put_group(merged);
    }

    resolution.interaction(InteractionKind::Clash, &key);
    Some(resolution)
}
