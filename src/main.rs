//! NPC Wrangle headless driver
//!
//! Runs two client replicas against a loopback bus through a short scripted
//! match and prints the final state of each as JSON. Usage:
//!
//! `npc-wrangle [tuning.json]`

use std::collections::VecDeque;
use std::path::PathBuf;

use glam::DVec2;
use serde::Serialize;

use npc_wrangle::Tuning;
use npc_wrangle::sim::{
    EmitError, EventSink, FrameInput, GroupPhase, InboundEvent, NpcGroup, OutboundEvent, World, frame,
};

const FRAME_MS: f64 = 1000.0 / 60.0;
const FRAMES: usize = 240;

/// Outbound events of one client, held until the next frame boundary
#[derive(Default)]
struct Outbox {
    queue: VecDeque<OutboundEvent>,
    sent: usize,
}

impl EventSink for Outbox {
    fn emit(&mut self, event: OutboundEvent) -> Result<(), EmitError> {
        self.sent += 1;
        self.queue.push_back(event);
        Ok(())
    }
}

impl Outbox {
    /// Echo everything to every replica (including the sender, like the real bus)
    fn flush_to(&mut self, worlds: &mut [&mut World]) {
        while let Some(event) = self.queue.pop_front() {
            if let Some(inbound) = event.to_inbound() {
                for world in worlds.iter_mut() {
                    world.apply_inbound(inbound.clone());
                }
            }
        }
    }
}

#[derive(Serialize)]
struct GroupSummary {
    id: String,
    phase: String,
    size: usize,
    face: Option<String>,
    position: [f64; 2],
}

fn summarize(world: &World) -> Vec<GroupSummary> {
    world
        .render_view()
        .into_iter()
        .map(|e| GroupSummary {
            phase: match (&e.phase, e.path_phase) {
                (GroupPhase::Captured { captor_id }, _) => format!("captured by {captor_id}"),
                (GroupPhase::Path, Some(path_phase)) => format!("{path_phase:?}").to_lowercase(),
                (phase, _) => format!("{phase:?}").to_lowercase(),
            },
            size: e.file_names.len(),
            face: e.face,
            position: [e.position.x, e.position.y],
            id: e.id,
        })
        .collect()
}

/// Alice walks east over a herd, then throws at Bob, who is holding his own
fn script(tick: usize, now: f64) -> (FrameInput, FrameInput) {
    let alice_x = (tick as f64 * 0.05).min(4.0);
    let alice = FrameInput {
        now,
        delta_secs: FRAME_MS / 1000.0,
        local_position: Some(DVec2::new(alice_x, 0.0)),
        local_direction: Some(DVec2::X),
        throw_count: (tick == 120).then_some(2),
        ..Default::default()
    };
    let bob = FrameInput {
        now,
        delta_secs: FRAME_MS / 1000.0,
        local_position: Some(DVec2::new(9.0, 0.0)),
        local_direction: Some(-DVec2::X),
        ..Default::default()
    };
    (alice, bob)
}

fn seed_world(world: &mut World) {
    let herd = |id: &str, n: usize, x: f64| {
        let members = (0..n).map(|i| format!("cat_{id}_{i}.png")).collect();
        NpcGroup::new(id, members, GroupPhase::Idle).at(DVec2::new(x, 0.0), DVec2::X)
    };
    for group in [herd("herd-1", 2, 1.0), herd("herd-2", 3, 3.0), herd("herd-3", 4, 9.0)] {
        world.apply_inbound(InboundEvent::GroupUpserted { group });
    }
}

fn main() {
    env_logger::init();
    log::info!("NPC Wrangle (headless) starting...");

    let tuning_path = std::env::args().nth(1).map(PathBuf::from);
    let tuning = Tuning::load_or_default(tuning_path.as_deref());

    let mut alice = World::new("alice", tuning.clone());
    let mut bob = World::new("bob", tuning);
    seed_world(&mut alice);
    seed_world(&mut bob);

    let mut alice_out = Outbox::default();
    let mut bob_out = Outbox::default();

    for tick in 0..FRAMES {
        let now = tick as f64 * FRAME_MS;
        let (alice_input, bob_input) = script(tick, now);

        let a = frame(&mut alice, &alice_input, &mut alice_out);
        let b = frame(&mut bob, &bob_input, &mut bob_out);
        if a != Default::default() || b != Default::default() {
            log::info!("t={:.0}ms alice={:?} bob={:?}", now, a, b);
        }

        alice_out.flush_to(&mut [&mut alice, &mut bob]);
        bob_out.flush_to(&mut [&mut alice, &mut bob]);
    }

    log::info!(
        "Sent {} events from alice, {} from bob",
        alice_out.sent,
        bob_out.sent
    );

    alice.teardown();
    bob.teardown();

    let report = serde_json::json!({
        "alice": summarize(&alice),
        "bob": summarize(&bob),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to encode report: {}", e),
    }
}
