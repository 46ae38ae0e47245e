use serde::{Deserialize, Serialize};

use crate::constants::{CURSOR_DONE, LAST_REVEAL_STEP};

/// Progress through the reveal: 0 is the intro, 1..=5 count revealed slots,
/// 6 means every slot has been acknowledged.
///
/// The cursor only moves forward; a new batch gets a fresh cursor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RevealCursor(u8);

impl RevealCursor {
    pub const INTRO: Self = Self(0);
    pub const DONE: Self = Self(CURSOR_DONE);

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The cursor as a timeline step index.
    #[must_use]
    pub const fn step(self) -> i32 {
        self.0 as i32
    }

    /// Whether the cursor points at a character slot with a window.
    #[must_use]
    pub const fn on_character(self) -> bool {
        self.0 >= 1 && self.0 <= LAST_REVEAL_STEP
    }

    #[must_use]
    pub const fn is_done(self) -> bool {
        self.0 >= CURSOR_DONE
    }

    /// Batch index of the slot the cursor currently shows, if any.
    #[must_use]
    pub const fn slot(self) -> Option<usize> {
        if self.on_character() {
            Some(self.0 as usize - 1)
        } else {
            None
        }
    }

    /// Whether `slot` (0-based) has been revealed.
    #[must_use]
    pub const fn has_revealed(self, slot: usize) -> bool {
        (self.0 as usize) > slot
    }

    /// Step forward once, saturating at [`RevealCursor::DONE`].
    pub const fn advance(&mut self) {
        if self.0 < CURSOR_DONE {
            self.0 += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_intro_to_done() {
        let mut cursor = RevealCursor::INTRO;
        assert!(!cursor.on_character());
        assert_eq!(cursor.slot(), None);

        cursor.advance();
        assert!(cursor.on_character());
        assert_eq!(cursor.slot(), Some(0));
        assert!(cursor.has_revealed(0));
        assert!(!cursor.has_revealed(1));

        for _ in 0..10 {
            cursor.advance();
        }
        assert_eq!(cursor, RevealCursor::DONE);
        assert!(cursor.is_done());
        assert!(!cursor.on_character());
        assert_eq!(cursor.step(), 6);
    }
}
