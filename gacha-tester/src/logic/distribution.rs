//! Tier-distribution analysis over a large number of independent rolls.
use anyhow::{Result, bail};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use gacha_engine::numbers::ratio;
use gacha_engine::{PayoutRange, RewardRoller, RollTable, Tier};

/// Allowed absolute deviation between observed and configured tier rates.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub tier: Tier,
    pub count: usize,
    pub observed: f64,
    pub expected: f64,
    pub range: PayoutRange,
    pub min_payout: Option<u32>,
    pub max_payout: Option<u32>,
    pub out_of_range: usize,
}

impl TierStats {
    fn new(tier: Tier, table: &RollTable) -> Self {
        Self {
            tier,
            count: 0,
            observed: 0.0,
            expected: table.probability(tier),
            range: table.payout_range(tier),
            min_payout: None,
            max_payout: None,
            out_of_range: 0,
        }
    }

    fn record(&mut self, payout: u32) {
        self.count += 1;
        self.min_payout = Some(self.min_payout.map_or(payout, |min| min.min(payout)));
        self.max_payout = Some(self.max_payout.map_or(payout, |max| max.max(payout)));
        if !self.range.contains(payout) {
            self.out_of_range += 1;
        }
    }

    #[must_use]
    pub fn deviation(&self) -> f64 {
        (self.observed - self.expected).abs()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub seed: u64,
    pub rolls: usize,
    pub tiers: Vec<TierStats>,
    pub mean_payout: f64,
}

/// Roll `rolls` rewards from `table` with a seeded generator.
#[must_use]
pub fn run_distribution(table: &RollTable, rolls: usize, seed: u64) -> DistributionReport {
    let roller = RewardRoller::new(table.clone());
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut tiers: Vec<TierStats> = Tier::ALL
        .iter()
        .map(|tier| TierStats::new(*tier, table))
        .collect();
    let mut payout_sum = 0usize;

    for _ in 0..rolls {
        let reward = roller.roll(&mut rng);
        payout_sum = payout_sum.saturating_add(usize::try_from(reward.payout).unwrap_or(0));
        if let Some(stats) = tiers.iter_mut().find(|stats| stats.tier == reward.tier) {
            stats.record(reward.payout);
        }
    }
    for stats in &mut tiers {
        stats.observed = ratio(stats.count, rolls);
    }

    DistributionReport {
        seed,
        rolls,
        tiers,
        mean_payout: ratio(payout_sum, rolls),
    }
}

/// Fail when any tier drifts past `tolerance` or any payout left its range.
///
/// # Errors
///
/// Returns an error naming every violated tier.
pub fn validate_distribution(report: &DistributionReport, tolerance: f64) -> Result<()> {
    let mut problems = Vec::new();
    for stats in &report.tiers {
        if stats.deviation() > tolerance {
            problems.push(format!(
                "{} rate {:.4} deviates from {:.4} by more than {tolerance}",
                stats.tier, stats.observed, stats.expected
            ));
        }
        if stats.out_of_range > 0 {
            problems.push(format!(
                "{} produced {} payouts outside {}..={}",
                stats.tier, stats.out_of_range, stats.range.min, stats.range.max
            ));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        bail!("roll distribution check failed: {}", problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_passes_at_scale() {
        let report = run_distribution(&RollTable::default(), 100_000, 1337);
        assert_eq!(report.tiers.len(), 3);
        assert_eq!(report.tiers.iter().map(|t| t.count).sum::<usize>(), 100_000);
        validate_distribution(&report, DEFAULT_TOLERANCE).expect("within tolerance");
        assert!(report.mean_payout > 3.0 && report.mean_payout < 10.0);
    }

    #[test]
    fn drift_is_reported() {
        let mut report = run_distribution(&RollTable::default(), 1_000, 3);
        report.tiers[0].observed = 0.5;
        let err = validate_distribution(&report, DEFAULT_TOLERANCE).unwrap_err();
        assert!(err.to_string().contains("R rate 0.5000"));
    }

    #[test]
    fn empty_run_has_zero_rates() {
        let report = run_distribution(&RollTable::default(), 0, 3);
        assert!(report.tiers.iter().all(|t| t.count == 0 && t.observed == 0.0));
        assert!(report.tiers.iter().all(|t| t.min_payout.is_none()));
    }
}
