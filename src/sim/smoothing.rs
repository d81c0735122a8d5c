//! Rendered-position smoothing and local broadcast throttling
//!
//! Purely visual for remote entities: collision logic always uses the latest
//! network position, never the smoothed one.

use glam::DVec2;

use crate::tuning::Tuning;
use crate::{heading, normalize_angle};

/// Next rendered position moving from `current` toward `target`
///
/// Takes whichever of a lerp step and a constant-speed step covers more
/// ground: the lerp dominates far away, the constant step finishes the last
/// stretch instead of creeping. Never overshoots.
pub fn smooth_step(current: DVec2, target: DVec2, delta_secs: f64, factor: f64, move_speed: f64) -> DVec2 {
    let offset = target - current;
    let distance = offset.length();
    if distance == 0.0 {
        return target;
    }
    let lerp_step = distance * factor.clamp(0.0, 1.0);
    let speed_step = (move_speed * delta_secs.max(0.0)).min(distance);
    let step = lerp_step.max(speed_step);
    if step >= distance {
        target
    } else {
        current + offset * (step / distance)
    }
}

/// Smoothed render state of a remote entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteMotion {
    pub rendered: DVec2,
    pub target: DVec2,
}

impl RemoteMotion {
    /// Start at the first known position (no slide-in)
    pub fn new(position: DVec2) -> Self {
        Self {
            rendered: position,
            target: position,
        }
    }

    pub fn retarget(&mut self, target: DVec2) {
        self.target = target;
    }

    pub fn advance(&mut self, delta_secs: f64, tuning: &Tuning) -> DVec2 {
        self.rendered = smooth_step(
            self.rendered,
            self.target,
            delta_secs,
            tuning.smoothing_factor,
            tuning.remote_move_speed,
        );
        self.rendered
    }
}

/// Decides when the local avatar's movement is worth sending
#[derive(Debug, Clone, Default)]
pub struct BroadcastThrottle {
    last: Option<(f64, DVec2, DVec2)>,
}

impl BroadcastThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True (and records the send) when enough time passed and the avatar
    /// moved or turned past the thresholds
    pub fn should_send(&mut self, now: f64, position: DVec2, direction: DVec2, tuning: &Tuning) -> bool {
        if let Some((sent_at, sent_pos, sent_dir)) = self.last {
            if now - sent_at < tuning.broadcast_min_interval_ms {
                return false;
            }
            let moved = position.distance(sent_pos) > tuning.broadcast_min_position_delta;
            let turned = normalize_angle(heading(direction) - heading(sent_dir)).abs()
                > tuning.broadcast_min_direction_delta;
            if !moved && !turned {
                return false;
            }
        }
        self.last = Some((now, position, direction));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_far_target_uses_lerp() {
        let next = smooth_step(DVec2::ZERO, DVec2::new(100.0, 0.0), 1.0 / 60.0, 0.15, 8.0);
        assert!((next.x - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_near_target_uses_constant_speed() {
        let next = smooth_step(DVec2::ZERO, DVec2::new(0.5, 0.0), 0.05, 0.15, 8.0);
        // lerp would give 0.075, constant speed gives 0.4
        assert!((next.x - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_never_overshoots() {
        let target = DVec2::new(0.1, 0.1);
        assert_eq!(smooth_step(DVec2::ZERO, target, 1.0, 0.15, 8.0), target);
    }

    #[test]
    fn test_remote_motion_converges() {
        let tuning = Tuning::default();
        let mut motion = RemoteMotion::new(DVec2::ZERO);
        motion.retarget(DVec2::new(10.0, -4.0));
        for _ in 0..120 {
            motion.advance(1.0 / 60.0, &tuning);
        }
        assert_eq!(motion.rendered, motion.target);
    }

    #[test]
    fn test_throttle() {
        let tuning = Tuning::default();
        let mut throttle = BroadcastThrottle::new();
        assert!(throttle.should_send(0.0, DVec2::ZERO, DVec2::X, &tuning));
        // too soon
        assert!(!throttle.should_send(10.0, DVec2::new(5.0, 0.0), DVec2::X, &tuning));
        // not moved enough
        assert!(!throttle.should_send(100.0, DVec2::new(0.01, 0.0), DVec2::X, &tuning));
        // turned
        assert!(throttle.should_send(100.0, DVec2::ZERO, DVec2::Y, &tuning));
        assert!(throttle.should_send(200.0, DVec2::new(1.0, 0.0), DVec2::Y, &tuning));
    }
}
