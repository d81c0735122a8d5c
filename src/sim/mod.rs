//! Deterministic replication and collision module
//!
//! Every client runs this independently against its own replica. Outcomes
//! must agree without coordination:
//! - Resolvers read only replicated fields (no wall clock, no local RNG)
//! - Stable iteration order (by entity id)
//! - One contact yields one mutation (idempotency guard)
//! - No rendering or transport dependencies

pub mod capture;
pub mod collision;
pub mod events;
pub mod guard;
pub mod outcome;
pub mod path;
pub mod reflection;
pub mod registry;
pub mod resolution;
pub mod schedule;
pub mod smoothing;
pub mod species;
pub mod state;
pub mod tick;
pub mod world;

pub use capture::{ThrowError, can_capture, resolve_capture, throw};
pub use collision::{OrientedRect, collides, rects_collide};
pub use events::{CollectingSink, EmitError, EventSink, InboundEvent, InteractionKind, OutboundEvent};
pub use guard::IdempotencyGuard;
pub use outcome::OutcomeSeed;
pub use path::PathMap;
pub use reflection::{resolve_clash, resolve_reflection};
pub use registry::{Change, Registry};
pub use resolution::Resolution;
pub use schedule::{Scheduler, Token};
pub use smoothing::{BroadcastThrottle, RemoteMotion, smooth_step};
pub use species::{Orientation, Species};
pub use state::{Avatar, GroupPhase, NpcGroup, Path, PathPhase};
pub use tick::{FrameInput, FrameStats, frame};
pub use world::{RenderEntity, World};
