//! Per-frame pass
//!
//! One synchronous sweep per rendered frame: release expired guard keys,
//! take local input, move in-flight groups along their paths, finish
//! completed flights, detect and resolve contacts, then smooth remote avatars.

use glam::DVec2;

use super::capture::{capture_key, resolve_capture, throw};
use super::collision::{capture_hitbox, collides, group_hitbox};
use super::events::{EventSink, OutboundEvent, emit_all};
use super::reflection::{clash_key, reflection_key, resolve_clash, resolve_reflection};
use super::resolution::Resolution;
use super::species::Species;
use super::state::{Avatar, GroupPhase, Path, PathPhase};
use super::world::World;
use crate::unit_or;

/// Inputs for a single frame
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Current time (ms, same clock as path timestamps)
    pub now: f64,
    /// Seconds since the previous frame
    pub delta_secs: f64,
    /// Local avatar position straight from input
    pub local_position: Option<DVec2>,
    pub local_direction: Option<DVec2>,
    pub local_species: Option<Species>,
    /// Throw this many members of the local captured group
    pub throw_count: Option<usize>,
}

/// What happened during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub captures: u32,
    pub reflections: u32,
    pub clashes: u32,
    pub landed: u32,
    pub returning: u32,
}

/// Advance the local replica by one frame
pub fn frame(world: &mut World, input: &FrameInput, sink: &mut dyn EventSink) -> FrameStats {
    let now = input.now;
    let mut stats = FrameStats::default();

    world.guard.advance(now);
    apply_local_input(world, input, sink);

    if let Some(count) = input.throw_count {
        throw_local(world, count, now, sink);
    }

    reposition(world, now);
    complete_paths(world, now, sink, &mut stats);
    scan_reflections(world, now, sink, &mut stats);
    scan_clashes(world, now, sink, &mut stats);
    scan_captures(world, now, sink, &mut stats);

    for motion in world.motion.values_mut() {
        motion.advance(input.delta_secs, &world.tuning);
    }

    stats
}

/// Local position is written immediately; broadcasts are throttled
fn apply_local_input(world: &mut World, input: &FrameInput, sink: &mut dyn EventSink) {
    let Some(position) = input.local_position else {
        return;
    };
    let user = world.local_user.clone();
    let avatar = world
        .avatars
        .entry(user.clone())
        .or_insert_with(|| Avatar::new(user.clone(), position, DVec2::X));
    avatar.position = position;
    if let Some(direction) = input.local_direction {
        avatar.direction = unit_or(direction, avatar.direction);
    }
    if let Some(species) = input.local_species {
        avatar.species = species;
    }
    let direction = avatar.direction;
    let species = avatar.species;

    if world
        .throttle
        .should_send(input.now, position, direction, &world.tuning)
    {
        emit_all(
            sink,
            vec![OutboundEvent::AvatarMoved {
                user_id: user,
                position,
                direction,
                species,
            }],
        );
    }
}

fn throw_local(world: &mut World, count: usize, now: f64, sink: &mut dyn EventSink) {
    let Some(avatar) = world.avatars.get(&world.local_user).cloned() else {
        log::debug!("Throw ignored: local avatar not placed yet");
        return;
    };
    let ids = world.fresh_ids();
    match throw(&world.registry, &avatar, count, ids, now, &world.tuning) {
        Ok(resolution) => world.apply(resolution, sink),
        Err(e) => log::debug!("Throw ignored: {}", e),
    }
}

/// In-flight groups follow their path, captured groups their captor
fn reposition(world: &mut World, now: f64) {
    let paths = &world.paths;
    let avatars = &world.avatars;
    for group in world.registry.iter_mut() {
        match &group.phase {
            GroupPhase::Path => {
                if let Some(path) = paths.get(&group.id) {
                    group.position = path.position_at(now);
                    group.direction = path.direction;
                }
            }
            GroupPhase::Captured { captor_id } => {
                if let Some(avatar) = avatars.get(captor_id) {
                    group.position = avatar.position;
                    group.direction = avatar.direction;
                }
            }
            GroupPhase::Idle => {}
        }
    }
}

/// Flights past their duration land, or turn home if we threw them
fn complete_paths(world: &mut World, now: f64, sink: &mut dyn EventSink, stats: &mut FrameStats) {
    let done: Vec<Path> = world
        .paths
        .iter()
        .filter(|p| p.is_complete(now))
        .cloned()
        .collect();

    for path in done {
        let Some(group) = world.registry.get_by_group_id(&path.npc_group_id) else {
            // A finished flight whose group never arrived (or was deleted
            // before a stale path echo) has nothing left to move
            log::debug!("Dropping orphaned path {} for {}", path.id, path.npc_group_id);
            world.paths.remove(&path.npc_group_id);
            continue;
        };
        if !group.is_in_flight() {
            continue;
        }
        let end = path.end_position();
        let mut resolution = Resolution::new();

        if path.path_phase == PathPhase::Thrown {
            let owner = path.owner_id.as_deref().and_then(|o| world.avatars.get(o));
            match owner {
                Some(owner) if owner.user_id == world.local_user => {
                    let offset = owner.position - end;
                    if offset.length() > world.tuning.group_width / 2.0 {
                        let returning = Path {
                            start_position: end,
                            direction: offset.normalize(),
                            velocity: world.tuning.return_velocity,
                            timestamp: now,
                            path_duration: offset.length() / world.tuning.return_velocity * 1000.0,
                            path_phase: PathPhase::Returning,
                            ..path.clone()
                        };
                        resolution.put_group(group.clone().at(end, returning.direction));
                        resolution.update_path(returning);
                        world.apply(resolution, sink);
                        stats.returning += 1;
                        continue;
                    }
                }
                // The owner's client sends the return
                Some(_) => continue,
                None => {}
            }
        }

        let mut landed = group.clone().at(end, group.direction);
        landed.phase = GroupPhase::Idle;
        log::debug!("{} landed at ({:.2}, {:.2})", landed.id, end.x, end.y);
        resolution.cancel_path(&path);
        resolution.put_group(landed);
        world.apply(resolution, sink);
        stats.landed += 1;
    }
}

/// Run a resolver behind the idempotency guard
fn guarded(
    world: &mut World,
    key: &str,
    now: f64,
    sink: &mut dyn EventSink,
    resolve: impl FnOnce(&World) -> Option<Resolution>,
) -> bool {
    if !world.guard.try_begin(key) {
        return false;
    }
    match resolve(&*world) {
        Some(resolution) => {
            world.apply(resolution, sink);
            world.guard.settle(key, now);
            true
        }
        None => {
            world.guard.abandon(key);
            false
        }
    }
}

/// Attacking paths against captured groups
fn scan_reflections(world: &mut World, now: f64, sink: &mut dyn EventSink, stats: &mut FrameStats) {
    let mut contacts = Vec::new();
    for path in world.paths.iter().filter(|p| p.path_phase.is_attacking()) {
        let Some(attacker) = world.registry.get_by_group_id(&path.npc_group_id) else {
            continue;
        };
        if !attacker.is_in_flight() {
            continue;
        }
        let hitbox = group_hitbox(attacker, &world.tuning);
        for defender in world.registry.iter() {
            let Some(captor) = defender.captor_id() else {
                continue;
            };
            if path.owner_id.as_deref() == Some(captor) {
                continue;
            }
            if collides(&hitbox, &group_hitbox(defender, &world.tuning)) {
                contacts.push((path.id.clone(), attacker.id.clone(), defender.id.clone()));
            }
        }
    }

    for (path_id, attacker_id, defender_id) in contacts {
        let key = reflection_key(&path_id, &defender_id);
        if guarded(world, &key, now, sink, |w| {
            resolve_reflection(&w.registry, &w.paths, &attacker_id, &defender_id, now, &w.tuning)
        }) {
            stats.reflections += 1;
        }
    }
}

/// Attacking paths against each other
fn scan_clashes(world: &mut World, now: f64, sink: &mut dyn EventSink, stats: &mut FrameStats) {
    let flying: Vec<_> = world
        .paths
        .iter()
        .filter(|p| p.path_phase.is_attacking())
        .filter_map(|p| world.registry.get_by_group_id(&p.npc_group_id).map(|g| (g, p)))
        .filter(|(g, _)| g.is_in_flight())
        .map(|(g, p)| (g.id.clone(), p.owner_id.clone(), group_hitbox(g, &world.tuning)))
        .collect();

    let mut contacts = Vec::new();
    for (i, (a, a_owner, a_box)) in flying.iter().enumerate() {
        for (b, b_owner, b_box) in &flying[i + 1..] {
            // A player's own groups pass through each other
            if a_owner.is_some() && a_owner == b_owner {
                continue;
            }
            if collides(a_box, b_box) {
                contacts.push((a.clone(), b.clone()));
            }
        }
    }

    for (a, b) in contacts {
        let key = clash_key(&a, &b);
        if guarded(world, &key, now, sink, |w| {
            resolve_clash(&w.registry, &w.paths, &a, &b, now, &w.tuning)
        }) {
            stats.clashes += 1;
        }
    }
}

/// Local avatar against every group it could take
fn scan_captures(world: &mut World, now: f64, sink: &mut dyn EventSink, stats: &mut FrameStats) {
    let Some(avatar) = world.avatars.get(&world.local_user).cloned() else {
        return;
    };
    let hitbox = capture_hitbox(avatar.position, avatar.direction, avatar.species, &world.tuning);
    let candidates: Vec<_> = world
        .registry
        .iter()
        .filter(|g| !g.is_captured())
        .filter(|g| collides(&hitbox, &group_hitbox(g, &world.tuning)))
        .map(|g| g.id.clone())
        .collect();

    for group_id in candidates {
        let key = capture_key(&avatar.user_id, &group_id);
        if guarded(world, &key, now, sink, |w| {
            resolve_capture(&w.registry, &w.paths, &avatar, &group_id, now, &w.tuning)
        }) {
            stats.captures += 1;
        }
    }
}
