//! Per-species sprite orientation
//!
//! Sprites are drawn facing different ways, so hit-box rotation needs a
//! per-species offset. Adding a species forces a decision here.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Sprite orientation correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Added to the heading to get the hit-box rotation (radians)
    pub rotation_offset: f64,
    /// Sprite is mirrored vertically when facing left
    pub vertical_flip: bool,
}

/// Known species, parsed from member identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Cat,
    Dog,
    Bird,
    Fish,
    Rabbit,
    #[default]
    Other,
}

impl Species {
    /// Species of a member identity such as `"cat_03.png"` or `"npcs/Dog-1.svg"`
    pub fn from_file_name(name: &str) -> Self {
        let base = name.rsplit('/').next().unwrap_or(name);
        let prefix: String = base
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        match prefix.as_str() {
            "cat" => Species::Cat,
            "dog" => Species::Dog,
            "bird" => Species::Bird,
            "fish" => Species::Fish,
            "rabbit" | "bunny" => Species::Rabbit,
            _ => Species::Other,
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Species::Cat => Orientation {
                rotation_offset: 0.0,
                vertical_flip: true,
            },
            Species::Dog => Orientation {
                rotation_offset: PI,
                vertical_flip: true,
            },
            Species::Bird => Orientation {
                rotation_offset: -FRAC_PI_2,
                vertical_flip: false,
            },
            Species::Fish => Orientation {
                rotation_offset: 0.0,
                vertical_flip: true,
            },
            Species::Rabbit => Orientation {
                rotation_offset: FRAC_PI_2,
                vertical_flip: false,
            },
            Species::Other => Orientation {
                rotation_offset: 0.0,
                vertical_flip: false,
            },
        }
    }
}

/// Rotation offset for a group: its face's species, or zero when empty
pub fn group_rotation_offset(file_names: &[String]) -> f64 {
    file_names
        .first()
        .map(|face| Species::from_file_name(face).orientation().rotation_offset)
        .unwrap_or(0.0)
}
