use serde::{Deserialize, Serialize};
use std::fmt;

/// The four screens a session moves through. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Idle menu with the draw button.
    #[default]
    Main,
    /// Stage assets warming behind a loading overlay.
    Preload,
    /// Stepping through the character reveals.
    Show,
    /// Aggregate total and redemption.
    Result,
}

impl SessionPhase {
    /// Phases from which a new draw may start.
    #[must_use]
    pub const fn accepts_draw(self) -> bool {
        matches!(self, Self::Main | Self::Result)
    }

    /// Whether the 3D stage is mounted in this phase.
    #[must_use]
    pub const fn shows_stage(self) -> bool {
        matches!(self, Self::Preload | Self::Show)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "MAIN"),
            Self::Preload => write!(f, "PRELOAD"),
            Self::Show => write!(f, "SHOW"),
            Self::Result => write!(f, "RESULT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_is_accepted_from_idle_and_result_only() {
        assert!(SessionPhase::Main.accepts_draw());
        assert!(SessionPhase::Result.accepts_draw());
        assert!(!SessionPhase::Preload.accepts_draw());
        assert!(!SessionPhase::Show.accepts_draw());
    }

    #[test]
    fn phase_serializes_as_screen_name() {
        let json = serde_json::to_string(&SessionPhase::Show).expect("serialize");
        assert_eq!(json, "\"SHOW\"");
        assert_eq!(SessionPhase::Result.to_string(), "RESULT");
        assert!(SessionPhase::Preload.shows_stage());
        assert!(!SessionPhase::Main.shows_stage());
    }
}
