//! Entity registry
//!
//! One canonical store keyed by group id plus a captor → group index. The
//! index is derived: every mutating operation maintains it, so callers never
//! observe the two disagreeing.

use std::collections::{BTreeMap, HashMap};

use super::state::NpcGroup;
use crate::GroupId;

/// A single registry mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert or replace a group (an empty group is deleted instead)
    Upsert(NpcGroup),
    /// Remove a group
    Delete(GroupId),
}

/// Dual-indexed store of NPC groups
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Sorted by id for deterministic iteration
    groups: BTreeMap<GroupId, NpcGroup>,
    by_captor: HashMap<String, GroupId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_group_id(&self, id: &str) -> Option<&NpcGroup> {
        self.groups.get(id)
    }

    pub fn get_by_captor_id(&self, user_id: &str) -> Option<&NpcGroup> {
        self.by_captor
            .get(user_id)
            .and_then(|id| self.groups.get(id))
    }

    /// Insert or replace a group; an empty group is deleted instead
    pub fn set_by_group_id(&mut self, id: &str, mut group: NpcGroup) {
        if group.is_empty() {
            self.delete_by_group_id(id);
            return;
        }
        group.id = id.to_owned();
        self.unindex(id);
        if let Some(captor) = group.captor_id() {
            // A captor owns at most one group; a newer one displaces the old index entry
            if let Some(previous) = self.by_captor.insert(captor.to_owned(), id.to_owned()) {
                if previous != id {
                    log::debug!("Captor {} moved from group {} to {}", captor, previous, id);
                }
            }
        }
        self.groups.insert(id.to_owned(), group);
    }

    pub fn delete_by_group_id(&mut self, id: &str) -> Option<NpcGroup> {
        self.unindex(id);
        self.groups.remove(id)
    }

    /// Apply a batch of changes as one transition
    ///
    /// The batch is applied to a copy which then replaces `self`, so there
    /// is no observable state where only part of the batch has landed.
    pub fn commit(&mut self, changes: impl IntoIterator<Item = Change>) {
        let mut next = self.clone();
        for change in changes {
            match change {
                Change::Upsert(group) => {
                    let id = group.id.clone();
                    next.set_by_group_id(&id, group);
                }
                Change::Delete(id) => {
                    next.delete_by_group_id(&id);
                }
            }
        }
        *self = next;
    }

    /// Groups in id order
    pub fn iter(&self) -> impl Iterator<Item = &NpcGroup> {
        self.groups.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NpcGroup> {
        // Phase changes must go through set_by_group_id; positions may be updated in place
        self.groups.values_mut()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn unindex(&mut self, id: &str) {
        let Some(captor) = self.groups.get(id).and_then(|g| g.captor_id()).map(str::to_owned) else {
            return;
        };
        if !self.by_captor.get(&captor).is_some_and(|indexed| indexed == id) {
            return;
        }
        self.by_captor.remove(&captor);

        // A displaced group of the same captor becomes reachable again
        let survivor = self
            .groups
            .iter()
            .find(|(other, g)| other.as_str() != id && g.captor_id() == Some(captor.as_str()))
            .map(|(other, _)| other.clone());
        if let Some(survivor) = survivor {
            log::debug!("Captor {} re-indexed to group {}", captor, survivor);
            self.by_captor.insert(captor, survivor);
        }
    }
}
