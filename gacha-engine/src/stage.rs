//! Stage capability (spawn transforms, camera hook) and the per-character
//! presentation derived from session state.
use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMON_PULSE_SPEED, LIGHT_BASE_INTENSITY, LIGHT_HUE_REV_PER_SEC, LIGHT_PULSE_AMPLITUDE,
    LIGHT_SETTLE_RATE, LIGHT_SETTLED_INTENSITY, RARE_PULSE_SPEED, SUPER_RARE_PULSE_SPEED,
};
use crate::reward::Tier;
use crate::timeline::AnimationMixer;

/// Position and Euler rotation of a character spawn node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

/// Renderer collaborator: animation channels plus the scene nodes the
/// session needs once assets resolve.
pub trait Stage: AnimationMixer {
    /// Spawn transform for a character slot (`0..5`), if the node exists.
    fn spawn_point(&self, slot: usize) -> Option<SpawnPoint>;

    /// Hand the scene's authored camera to the renderer.
    /// Returns `false` when the scene carries no camera.
    fn provide_camera(&mut self) -> bool;
}

/// Spotlight colour behaviour for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightColor {
    Fixed { hex: &'static str },
    HueCycle { rev_per_sec: f32 },
}

/// Spotlight cue for a silhouetted character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightCue {
    pub color: LightColor,
    /// Angular speed of the pre-reveal intensity pulse, in rad/s.
    pub pulse_speed: f32,
}

impl LightCue {
    #[must_use]
    pub const fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Common => Self {
                color: LightColor::Fixed { hex: "#00bfff" },
                pulse_speed: COMMON_PULSE_SPEED,
            },
            Tier::Rare => Self {
                color: LightColor::Fixed { hex: "#ffd700" },
                pulse_speed: RARE_PULSE_SPEED,
            },
            Tier::SuperRare => Self {
                color: LightColor::HueCycle {
                    rev_per_sec: LIGHT_HUE_REV_PER_SEC,
                },
                pulse_speed: SUPER_RARE_PULSE_SPEED,
            },
        }
    }

    /// Hue in `[0, 1)` at `elapsed` seconds, or `None` for a fixed colour.
    #[must_use]
    pub fn hue_at(&self, elapsed: f32) -> Option<f32> {
        match self.color {
            LightColor::Fixed { .. } => None,
            LightColor::HueCycle { rev_per_sec } => Some((elapsed * rev_per_sec).rem_euclid(1.0)),
        }
    }

    /// Intensity while the character is still a silhouette.
    #[must_use]
    pub fn pulse_intensity(&self, elapsed: f32) -> f32 {
        LIGHT_BASE_INTENSITY + (elapsed * self.pulse_speed).sin() * LIGHT_PULSE_AMPLITUDE
    }

    /// One frame of easing toward the settled intensity after the reveal.
    #[must_use]
    pub fn settle(current: f32) -> f32 {
        current + (LIGHT_SETTLED_INTENSITY - current) * LIGHT_SETTLE_RATE
    }
}

/// Everything the renderer needs to draw one character slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterView {
    pub slot: usize,
    pub tier: Tier,
    pub revealed: bool,
    pub spawn: Option<SpawnPoint>,
    pub light: LightCue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_follow_tier() {
        let common = LightCue::for_tier(Tier::Common);
        assert_eq!(common.color, LightColor::Fixed { hex: "#00bfff" });
        assert!(common.hue_at(3.0).is_none());

        let rare = LightCue::for_tier(Tier::Rare);
        assert_eq!(rare.color, LightColor::Fixed { hex: "#ffd700" });
        assert!(rare.pulse_speed > common.pulse_speed);

        let super_rare = LightCue::for_tier(Tier::SuperRare);
        let hue = super_rare.hue_at(3.0).expect("cycling hue");
        assert!((hue - 0.5).abs() < 1e-6);
        assert!(super_rare.pulse_speed > rare.pulse_speed);
    }

    #[test]
    fn pulse_stays_within_band() {
        let cue = LightCue::for_tier(Tier::SuperRare);
        for step in 0..200u16 {
            let intensity = cue.pulse_intensity(f32::from(step) * 0.05);
            assert!((100.0..=200.0).contains(&intensity));
        }
    }

    #[test]
    fn settle_converges_on_resting_intensity() {
        let mut intensity = 180.0;
        for _ in 0..500 {
            intensity = LightCue::settle(intensity);
        }
        assert!((intensity - 100.0).abs() < 0.01);
    }
}
