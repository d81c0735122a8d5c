//! Client-local replica of the shared game state
//!
//! The world is the single writer of its registry and path map. Resolvers
//! read it and hand back a [`Resolution`]; [`World::apply`] lands it in one
//! step and forwards the intents.

use std::collections::BTreeMap;

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use sha2::{Digest, Sha256};

use super::events::{EventSink, InboundEvent, emit_all};
use super::guard::IdempotencyGuard;
use super::path::PathMap;
use super::registry::{Change, Registry};
use super::resolution::Resolution;
use super::smoothing::{BroadcastThrottle, RemoteMotion};
use super::species::{Orientation, Species};
use super::state::{Avatar, GroupPhase, NpcGroup, PathPhase};
use crate::tuning::Tuning;
use crate::{GroupId, PathId, UserId};

/// What the renderer draws for one group
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity {
    pub id: GroupId,
    pub position: DVec2,
    pub direction: DVec2,
    pub phase: GroupPhase,
    pub path_phase: Option<PathPhase>,
    pub file_names: Vec<String>,
    pub face: Option<String>,
    /// Sprite correction for the face's species
    pub orientation: Orientation,
}

/// One client's view of the game
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) local_user: UserId,
    pub(crate) tuning: Tuning,
    pub(crate) registry: Registry,
    pub(crate) paths: PathMap,
    /// Logical avatar state, keyed by user
    pub(crate) avatars: BTreeMap<UserId, Avatar>,
    /// Render-only smoothing for remote avatars
    pub(crate) motion: BTreeMap<UserId, RemoteMotion>,
    pub(crate) guard: IdempotencyGuard,
    pub(crate) throttle: BroadcastThrottle,
    id_rng: Pcg32,
}

impl World {
    pub fn new(local_user: impl Into<UserId>, tuning: Tuning) -> Self {
        let local_user = local_user.into();
        let mut hasher = Sha256::new();
        hasher.update(local_user.as_bytes());
        let digest = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);

        Self {
            guard: IdempotencyGuard::new(&tuning),
            id_rng: Pcg32::seed_from_u64(u64::from_le_bytes(seed)),
            local_user,
            tuning,
            registry: Registry::new(),
            paths: PathMap::new(),
            avatars: BTreeMap::new(),
            motion: BTreeMap::new(),
            throttle: BroadcastThrottle::new(),
        }
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn paths(&self) -> &PathMap {
        &self.paths
    }

    pub fn avatar(&self, user_id: &str) -> Option<&Avatar> {
        self.avatars.get(user_id)
    }

    /// Rendered position of a remote avatar (logical position for the local one)
    pub fn rendered_avatar_position(&self, user_id: &str) -> Option<DVec2> {
        self.motion
            .get(user_id)
            .map(|m| m.rendered)
            .or_else(|| self.avatars.get(user_id).map(|a| a.position))
    }

    /// Fresh ids for a locally initiated throw
    pub(crate) fn fresh_ids(&mut self) -> (GroupId, PathId) {
        let n: u64 = self.id_rng.random();
        (
            format!("{}-group-{n:016x}", self.local_user),
            format!("{}-path-{n:016x}", self.local_user),
        )
    }

    /// Replicate an inbound snapshot or delta
    pub fn apply_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::GroupUpserted { group } => self.upsert_group(group),
            InboundEvent::GroupDeleted { group_id } => {
                self.registry.delete_by_group_id(&group_id);
                self.paths.remove(&group_id);
            }
            InboundEvent::PathUpserted { path } => {
                match self.registry.get_by_group_id(&path.npc_group_id) {
                    Some(group) if !group.is_in_flight() => {
                        log::debug!("Dropping path {} for grounded group {}", path.id, group.id);
                    }
                    _ => {
                        self.paths.insert(path);
                    }
                }
            }
            InboundEvent::PathDeleted { path_id } => {
                self.paths.remove_by_path_id(&path_id);
            }
            InboundEvent::AvatarMoved {
                user_id,
                position,
                direction,
                species,
            } => {
                if user_id == self.local_user {
                    // Local position comes from input only
                    return;
                }
                self.motion
                    .entry(user_id.clone())
                    .or_insert_with(|| RemoteMotion::new(position))
                    .retarget(position);
                self.avatars
                    .entry(user_id.clone())
                    .and_modify(|a| {
                        a.position = position;
                        a.direction = direction;
                        a.species = species;
                    })
                    .or_insert(Avatar {
                        user_id,
                        position,
                        direction,
                        species,
                    });
            }
            InboundEvent::AvatarLeft { user_id } => {
                self.avatars.remove(&user_id);
                self.motion.remove(&user_id);
            }
        }
    }

    fn upsert_group(&mut self, group: NpcGroup) {
        if !group.is_in_flight() {
            self.paths.remove(&group.id);
        }
        let id = group.id.clone();
        self.registry.set_by_group_id(&id, group);
        if self.registry.get_by_group_id(&id).is_none() {
            self.paths.remove(&id);
        }
    }

    /// Land a resolution locally and send its intents
    pub fn apply(&mut self, resolution: Resolution, sink: &mut dyn EventSink) {
        let Resolution {
            changes,
            cancelled_paths,
            new_paths,
            outbound,
        } = resolution;

        for change in &changes {
            // Groups leaving PATH lose their path in the same step
            match change {
                Change::Upsert(group) if !group.is_in_flight() => {
                    self.paths.remove(&group.id);
                }
                Change::Delete(id) => {
                    self.paths.remove(id);
                }
                _ => {}
            }
        }
        self.registry.commit(changes);
        for group_id in cancelled_paths {
            self.paths.remove(&group_id);
        }
        for path in new_paths {
            self.paths.insert(path);
        }
        emit_all(sink, outbound);
    }

    /// Snapshot for the renderer
    pub fn render_view(&self) -> Vec<RenderEntity> {
        self.registry
            .iter()
            .map(|group| {
                let position = match group.captor_id() {
                    Some(captor) => self.rendered_avatar_position(captor).unwrap_or(group.position),
                    None => group.position,
                };
                RenderEntity {
                    id: group.id.clone(),
                    position,
                    direction: group.direction,
                    phase: group.phase.clone(),
                    path_phase: self.paths.get(&group.id).map(|p| p.path_phase),
                    file_names: group.file_names.clone(),
                    face: group.face().map(str::to_owned),
                    orientation: group
                        .face()
                        .map(Species::from_file_name)
                        .unwrap_or_default()
                        .orientation(),
                }
            })
            .collect()
    }

    /// Guard timers still waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.guard.pending_timers()
    }

    /// Cancel every pending timer; the world must not be advanced afterwards
    pub fn teardown(&mut self) {
        self.guard.teardown();
        log::info!("World for {} torn down", self.local_user);
    }
}
