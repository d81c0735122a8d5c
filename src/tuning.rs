//! Gameplay tuning parameters
//!
//! Every client evaluates collisions independently, so every client must run
//! with the same tuning. Values are loaded once at startup and never change.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating tuning
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("flee duration ({flee_ms} ms) must exceed the flee recapture cooldown ({cooldown_ms} ms)")]
    FleeTooShort { flee_ms: f64, cooldown_ms: f64 },
    #[error("debounce window ({recent_ms} ms) must not be shorter than the in-flight window ({in_flight_ms} ms)")]
    DebounceTooShort { recent_ms: f64, in_flight_ms: f64 },
    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

/// Shared gameplay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Hit-boxes ===
    /// Avatar width (world units)
    pub avatar_width: f64,
    /// Avatar height (world units)
    pub avatar_height: f64,
    /// Group width (world units)
    pub group_width: f64,
    /// Group height (world units)
    pub group_height: f64,
    /// Mover hit-box shrink for capture checks
    pub capture_hitbox_scale: f64,

    // === Capture cooldowns ===
    /// Thrower may not recapture its own THROWN group before this age (ms)
    pub throw_recapture_cooldown_ms: f64,
    /// Nobody may capture a FLEEING group before this age (ms)
    pub flee_recapture_cooldown_ms: f64,
    /// Nobody may capture a BOUNCING group before this age (ms)
    pub bounce_recapture_cooldown_ms: f64,

    // === Idempotency guard ===
    /// In-flight keys are released this long after the mutation is issued (ms)
    pub in_flight_window_ms: f64,
    /// Resolved keys are suppressed for this long (ms)
    pub recent_window_ms: f64,

    // === Paths ===
    pub throw_velocity: f64,
    pub throw_duration_ms: f64,
    pub bounce_velocity: f64,
    pub bounce_duration_ms: f64,
    pub flee_velocity: f64,
    pub flee_duration_ms: f64,
    pub return_velocity: f64,
    /// Full emission fan (degrees), centered on the impact direction
    pub emission_arc_deg: f64,
    /// Bounce perturbation is `hash * π * bounce_perturbation`
    pub bounce_perturbation: f64,

    // === Smoothing / broadcast ===
    /// Per-frame lerp factor toward the remote target
    pub smoothing_factor: f64,
    /// Constant-speed cap for remote smoothing (units/s)
    pub remote_move_speed: f64,
    /// Minimum interval between local avatar broadcasts (ms)
    pub broadcast_min_interval_ms: f64,
    /// Minimum position change before broadcasting (world units)
    pub broadcast_min_position_delta: f64,
    /// Minimum heading change before broadcasting (radians)
    pub broadcast_min_direction_delta: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            avatar_width: 1.2,
            avatar_height: 0.8,
            group_width: 1.0,
            group_height: 1.0,
            capture_hitbox_scale: 0.6,

            throw_recapture_cooldown_ms: 500.0,
            flee_recapture_cooldown_ms: 800.0,
            bounce_recapture_cooldown_ms: 400.0,

            in_flight_window_ms: 100.0,
            recent_window_ms: 300.0,

            throw_velocity: 12.0,
            throw_duration_ms: 1200.0,
            bounce_velocity: 9.0,
            bounce_duration_ms: 900.0,
            flee_velocity: 6.0,
            flee_duration_ms: 1500.0,
            return_velocity: 10.0,
            emission_arc_deg: 108.0,
            bounce_perturbation: 0.3,

            smoothing_factor: 0.15,
            remote_move_speed: 8.0,
            broadcast_min_interval_ms: 50.0,
            broadcast_min_position_delta: 0.05,
            broadcast_min_direction_delta: 0.02,
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a file, falling back to defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default tuning");
            return Self::default();
        };
        match std::fs::read_to_string(path)
            .map_err(TuningError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring tuning file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Check parameter combinations the resolvers rely on
    pub fn validate(&self) -> Result<(), TuningError> {
        let positives = [
            ("avatar_width", self.avatar_width),
            ("avatar_height", self.avatar_height),
            ("group_width", self.group_width),
            ("group_height", self.group_height),
            ("capture_hitbox_scale", self.capture_hitbox_scale),
            ("throw_velocity", self.throw_velocity),
            ("throw_duration_ms", self.throw_duration_ms),
            ("bounce_velocity", self.bounce_velocity),
            ("bounce_duration_ms", self.bounce_duration_ms),
            ("flee_velocity", self.flee_velocity),
            ("flee_duration_ms", self.flee_duration_ms),
            ("return_velocity", self.return_velocity),
            ("remote_move_speed", self.remote_move_speed),
        ];
        for (name, value) in positives {
            if !(value > 0.0) {
                return Err(TuningError::NotPositive(name));
            }
        }
        if self.flee_duration_ms <= self.flee_recapture_cooldown_ms {
            return Err(TuningError::FleeTooShort {
                flee_ms: self.flee_duration_ms,
                cooldown_ms: self.flee_recapture_cooldown_ms,
            });
        }
        if self.recent_window_ms < self.in_flight_window_ms {
            return Err(TuningError::DebounceTooShort {
                recent_ms: self.recent_window_ms,
                in_flight_ms: self.in_flight_window_ms,
            });
        }
        Ok(())
    }

    /// Full emission fan in radians
    pub fn emission_arc(&self) -> f64 {
        self.emission_arc_deg.to_radians()
    }
}
