//! Weighted reward rolls and the immutable batch a draw produces.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    BATCH_SIZE, COMMON_PAYOUT, DRAW_SCALE, RARE_BELOW, RARE_PAYOUT, SUPER_RARE_BELOW,
    SUPER_RARE_PAYOUT,
};

/// Reward rarity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Common,
    Rare,
    SuperRare,
}

impl Tier {
    /// Every tier, most common first.
    pub const ALL: [Self; 3] = [Self::Common, Self::Rare, Self::SuperRare];

    /// Short badge shown on the reveal and result screens.
    #[must_use]
    pub const fn display_tag(self) -> &'static str {
        match self {
            Self::Common => "R",
            Self::Rare => "SR",
            Self::SuperRare => "SSR",
        }
    }

    /// Gradient used for this tier's capsule on the result screen.
    #[must_use]
    pub const fn accent(self) -> &'static str {
        match self {
            Self::Common => "from-blue-400 to-cyan-300",
            Self::Rare => "from-gray-300 to-slate-500",
            Self::SuperRare => "from-yellow-300 to-amber-500",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_tag())
    }
}

/// A single rolled reward. Payout range is fixed by the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub tier: Tier,
    pub payout: u32,
}

impl Reward {
    #[must_use]
    pub const fn new(tier: Tier, payout: u32) -> Self {
        Self { tier, payout }
    }

    #[must_use]
    pub const fn display_tag(&self) -> &'static str {
        self.tier.display_tag()
    }

    /// Item name shown under the reveal, e.g. `Bonus SSR`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("Bonus {}", self.tier)
    }
}

/// Exactly [`BATCH_SIZE`] rewards produced atomically by one draw.
///
/// A batch is never edited; the next draw replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBatch {
    rewards: [Reward; BATCH_SIZE],
}

impl RewardBatch {
    #[must_use]
    pub const fn new(rewards: [Reward; BATCH_SIZE]) -> Self {
        Self { rewards }
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Reward> {
        self.rewards.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reward> {
        self.rewards.iter()
    }

    #[must_use]
    pub const fn as_slice(&self) -> &[Reward] {
        &self.rewards
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        BATCH_SIZE
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Sum of every payout in the batch.
    #[must_use]
    pub fn total_payout(&self) -> u32 {
        self.rewards
            .iter()
            .fold(0u32, |sum, reward| sum.saturating_add(reward.payout))
    }
}

/// Inclusive payout bounds for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRange {
    pub min: u32,
    pub max: u32,
}

impl PayoutRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(&self, payout: u32) -> bool {
        payout >= self.min && payout <= self.max
    }
}

/// Tier thresholds on a uniform `[0, 100)` draw plus payout ranges per tier.
///
/// Thresholds are inclusive-lower, exclusive-upper: a draw below
/// `super_rare_below` is super rare, below `rare_below` is rare, anything
/// else is common.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollTable {
    #[serde(default = "RollTable::default_super_rare_below")]
    pub super_rare_below: f64,
    #[serde(default = "RollTable::default_rare_below")]
    pub rare_below: f64,
    #[serde(default = "RollTable::default_super_rare")]
    pub super_rare: PayoutRange,
    #[serde(default = "RollTable::default_rare")]
    pub rare: PayoutRange,
    #[serde(default = "RollTable::default_common")]
    pub common: PayoutRange,
}

impl RollTable {
    const fn default_super_rare_below() -> f64 {
        SUPER_RARE_BELOW
    }

    const fn default_rare_below() -> f64 {
        RARE_BELOW
    }

    const fn default_super_rare() -> PayoutRange {
        PayoutRange::new(SUPER_RARE_PAYOUT.0, SUPER_RARE_PAYOUT.1)
    }

    const fn default_rare() -> PayoutRange {
        PayoutRange::new(RARE_PAYOUT.0, RARE_PAYOUT.1)
    }

    const fn default_common() -> PayoutRange {
        PayoutRange::new(COMMON_PAYOUT.0, COMMON_PAYOUT.1)
    }

    /// Tier selected by a draw value in `[0, 100)`.
    #[must_use]
    pub fn tier_for_draw(&self, draw: f64) -> Tier {
        if draw < self.super_rare_below {
            Tier::SuperRare
        } else if draw < self.rare_below {
            Tier::Rare
        } else {
            Tier::Common
        }
    }

    #[must_use]
    pub const fn payout_range(&self, tier: Tier) -> PayoutRange {
        match tier {
            Tier::Common => self.common,
            Tier::Rare => self.rare,
            Tier::SuperRare => self.super_rare,
        }
    }

    /// Probability of a tier, as a fraction of 1.0.
    #[must_use]
    pub fn probability(&self, tier: Tier) -> f64 {
        let share = match tier {
            Tier::SuperRare => self.super_rare_below,
            Tier::Rare => self.rare_below - self.super_rare_below,
            Tier::Common => DRAW_SCALE - self.rare_below,
        };
        share / DRAW_SCALE
    }
}

impl Default for RollTable {
    fn default() -> Self {
        Self {
            super_rare_below: Self::default_super_rare_below(),
            rare_below: Self::default_rare_below(),
            super_rare: Self::default_super_rare(),
            rare: Self::default_rare(),
            common: Self::default_common(),
        }
    }
}

/// Produces rewards from a [`RollTable`]; holds no state between rolls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardRoller {
    table: RollTable,
}

impl RewardRoller {
    #[must_use]
    pub const fn new(table: RollTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub const fn table(&self) -> &RollTable {
        &self.table
    }

    /// Roll one reward, consuming a uniform draw plus a payout draw.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Reward {
        let draw = rng.gen_range(0.0..DRAW_SCALE);
        self.roll_from_draw(draw, rng)
    }

    /// Resolve a reward from an already-sampled tier draw.
    pub fn roll_from_draw<R: Rng + ?Sized>(&self, draw: f64, rng: &mut R) -> Reward {
        let tier = self.table.tier_for_draw(draw);
        let range = self.table.payout_range(tier);
        let payout = rng.gen_range(range.min..=range.max);
        Reward::new(tier, payout)
    }

    /// Roll a full batch; each slot is an independent draw and tiers may repeat.
    pub fn roll_batch<R: Rng + ?Sized>(&self, rng: &mut R) -> RewardBatch {
        RewardBatch::new(std::array::from_fn(|_| self.roll(rng)))
    }
}
