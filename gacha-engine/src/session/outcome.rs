use serde::Serialize;

use super::{RevealCursor, SessionPhase};
use crate::constants::{PROMPT_NEXT, PROMPT_START};
use crate::redeem::Alert;
use crate::reward::{RewardBatch, Tier};
use crate::stage::CharacterView;

/// Transient "+N" shown while a slot's payout is being acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardPopup {
    pub slot: usize,
    pub tier: Tier,
    pub payout: u32,
}

/// What a tap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevealOutcome {
    /// A popup is in flight; the tap was dropped.
    Ignored,
    /// The intro gave way to the first character.
    Started,
    /// A payout popup is now showing.
    PopupShown(RewardPopup),
    /// Every slot was acknowledged; the session moved to RESULT.
    Finished { total: u32 },
}

/// What a delivered timer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerOutcome {
    /// The ticket belonged to an older session or no longer applies.
    Stale,
    /// PRELOAD finished; SHOW is active at the intro.
    EnteredShow,
    /// The popup cleared and the cursor moved on.
    PopupCleared { cursor: RevealCursor },
}

/// Hint drawn over the stage while waiting for a tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TapPrompt {
    Start,
    Next,
}

impl TapPrompt {
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Start => PROMPT_START,
            Self::Next => PROMPT_NEXT,
        }
    }
}

/// Read-only picture of everything presentation depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub cursor: RevealCursor,
    pub processing: bool,
    pub popup: Option<RewardPopup>,
    pub batch: Option<RewardBatch>,
    pub total_payout: u32,
    pub characters: Vec<CharacterView>,
    pub tap_prompt: Option<TapPrompt>,
    pub redeem_open: bool,
    pub alert: Option<Alert>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_have_copy() {
        assert_eq!(TapPrompt::Start.text(), "TAP TO START!");
        assert!(TapPrompt::Next.text().starts_with("TAP FOR NEXT"));
    }

    #[test]
    fn outcomes_serialize_with_kind_tag() {
        let json = serde_json::to_value(RevealOutcome::Finished { total: 42 }).expect("serialize");
        assert_eq!(json["kind"], "finished");
        assert_eq!(json["total"], 42);
    }
}
