//! Result of a resolver: local changes plus the intents announcing them

use super::events::{InteractionKind, OutboundEvent};
use super::registry::Change;
use super::state::{NpcGroup, Path};
use crate::GroupId;

/// Everything one resolved interaction changes
///
/// Resolvers only read state; the world applies a resolution in one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub changes: Vec<Change>,
    /// Groups whose path is cancelled (applied before `new_paths`)
    pub cancelled_paths: Vec<GroupId>,
    pub new_paths: Vec<Path>,
    pub outbound: Vec<OutboundEvent>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a group (deleting it instead if it has no members)
    pub fn put_group(&mut self, group: NpcGroup) {
        if group.is_empty() {
            self.delete_group(group.id);
            return;
        }
        self.outbound.push(OutboundEvent::GroupUpdated {
            group: group.clone(),
        });
        self.changes.push(Change::Upsert(group));
    }

    pub fn delete_group(&mut self, id: GroupId) {
        self.outbound.push(OutboundEvent::GroupDeleted {
            group_id: id.clone(),
        });
        self.changes.push(Change::Delete(id));
    }

    pub fn cancel_path(&mut self, path: &Path) {
        self.outbound.push(OutboundEvent::PathDeleted {
            path_id: path.id.clone(),
            group_id: path.npc_group_id.clone(),
        });
        self.cancelled_paths.push(path.npc_group_id.clone());
    }

    pub fn create_path(&mut self, path: Path) {
        self.outbound.push(OutboundEvent::PathCreated { path: path.clone() });
        self.new_paths.push(path);
    }

    /// Same path id, new parameters
    pub fn update_path(&mut self, path: Path) {
        self.outbound.push(OutboundEvent::PathUpdated { path: path.clone() });
        self.new_paths.push(path);
    }

    pub fn interaction(&mut self, kind: InteractionKind, key: &str) {
        self.outbound.push(OutboundEvent::InteractionDetected {
            kind,
            key: key.to_owned(),
        });
    }

    /// Groups this resolution writes or deletes
    pub fn touched_groups(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| match c {
            Change::Upsert(g) => g.id.as_str(),
            Change::Delete(id) => id.as_str(),
        })
    }
}
