//! Events exchanged with the transport layer
//!
//! Encoding is the transport's business; these are the typed payloads.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::species::Species;
use super::state::{NpcGroup, Path};
use crate::{GroupId, PathId, UserId};

/// Replicated state arriving from the server or peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    GroupUpserted { group: NpcGroup },
    GroupDeleted { group_id: GroupId },
    PathUpserted { path: Path },
    PathDeleted { path_id: PathId },
    AvatarMoved {
        user_id: UserId,
        position: DVec2,
        direction: DVec2,
        #[serde(default)]
        species: Species,
    },
    AvatarLeft { user_id: UserId },
}

/// What kind of contact produced a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Capture,
    Reflection,
    Clash,
}

/// Mutation intents produced by this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    GroupUpdated { group: NpcGroup },
    GroupDeleted { group_id: GroupId },
    PathCreated { path: Path },
    PathUpdated { path: Path },
    PathDeleted { path_id: PathId, group_id: GroupId },
    InteractionDetected { kind: InteractionKind, key: String },
    AvatarMoved {
        user_id: UserId,
        position: DVec2,
        direction: DVec2,
        species: Species,
    },
}

impl OutboundEvent {
    /// How peers see this intent once the bus has echoed it
    pub fn to_inbound(&self) -> Option<InboundEvent> {
        Some(match self {
            OutboundEvent::GroupUpdated { group } => InboundEvent::GroupUpserted {
                group: group.clone(),
            },
            OutboundEvent::GroupDeleted { group_id } => InboundEvent::GroupDeleted {
                group_id: group_id.clone(),
            },
            OutboundEvent::PathCreated { path } | OutboundEvent::PathUpdated { path } => {
                InboundEvent::PathUpserted { path: path.clone() }
            }
            OutboundEvent::PathDeleted { path_id, .. } => InboundEvent::PathDeleted {
                path_id: path_id.clone(),
            },
            OutboundEvent::AvatarMoved {
                user_id,
                position,
                direction,
                species,
            } => InboundEvent::AvatarMoved {
                user_id: user_id.clone(),
                position: *position,
                direction: *direction,
                species: *species,
            },
            OutboundEvent::InteractionDetected { .. } => return None,
        })
    }
}

/// Outbound delivery failure
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("event bus is closed")]
    Closed,
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Where outbound intents go
pub trait EventSink {
    fn emit(&mut self, event: OutboundEvent) -> Result<(), EmitError>;
}

/// Send every event, logging failures
///
/// There is no retry: if the precondition still holds next frame, the same
/// transition is attempted again.
pub fn emit_all(sink: &mut dyn EventSink, events: Vec<OutboundEvent>) {
    for event in events {
        if let Err(e) = sink.emit(event) {
            log::warn!("Dropped outbound event: {}", e);
        }
    }
}

/// Sink that keeps everything it is given
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<OutboundEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn interactions(&self) -> impl Iterator<Item = InteractionKind> + '_ {
        self.events.iter().filter_map(|e| match e {
            OutboundEvent::InteractionDetected { kind, .. } => Some(*kind),
            _ => None,
        })
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: OutboundEvent) -> Result<(), EmitError> {
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn emit(&mut self, _event: OutboundEvent) -> Result<(), EmitError> {
            Err(EmitError::Closed)
        }
    }

    #[test]
    fn test_emit_all_tolerates_failures() {
        let events = vec![OutboundEvent::GroupDeleted {
            group_id: "g".into(),
        }];
        emit_all(&mut ClosedSink, events);
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::new();
        emit_all(
            &mut sink,
            vec![
                OutboundEvent::InteractionDetected {
                    kind: InteractionKind::Capture,
                    key: "k".into(),
                },
                OutboundEvent::GroupDeleted {
                    group_id: "g".into(),
                },
            ],
        );
        assert_eq!(sink.interactions().collect::<Vec<_>>(), vec![InteractionKind::Capture]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_echo_mapping() {
        let deleted = OutboundEvent::PathDeleted {
            path_id: "p".into(),
            group_id: "g".into(),
        };
        assert_eq!(
            deleted.to_inbound(),
            Some(InboundEvent::PathDeleted { path_id: "p".into() })
        );
        let interaction = OutboundEvent::InteractionDetected {
            kind: InteractionKind::Clash,
            key: "k".into(),
        };
        assert_eq!(interaction.to_inbound(), None);
    }

    #[test]
    fn test_inbound_tagging() {
        let json = r#"{ "type": "avatar_left", "user_id": "bob" }"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            InboundEvent::AvatarLeft {
                user_id: "bob".into()
            }
        );
    }
}
