use anyhow::{Context, Result, ensure};

use gacha_engine::{Alert, AudioChannel, AudioConfig, RevealTimeline, SessionPhase, TapPrompt, TimerOutcome};

use crate::common::scenario::TestScenario;
use crate::logic::{GatewayTarget, SimulationPlan, SimulationSummary, Step};

const WARMUP_MS: u64 = 2_000;
const POPUP_MS: u64 = 1_500;
const CLIP_TOLERANCE: f32 = 1e-4;

pub fn catalog_scenarios() -> Vec<(&'static str, TestScenario)> {
    vec![
        (
            "smoke",
            TestScenario::simulation(
                "Smoke Test",
                SimulationPlan::new([Step::StageReady, Step::Draw, Step::wait_ms(WARMUP_MS)])
                    .with_expectation(smoke_expectation),
            ),
        ),
        (
            "full-reveal",
            TestScenario::simulation(
                "Full Reveal",
                SimulationPlan::new([
                    Step::StageReady,
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                    Step::RevealAll,
                ])
                .with_expectation(full_reveal_expectation),
            ),
        ),
        (
            "rapid-taps",
            TestScenario::simulation(
                "Rapid Tap Guard",
                SimulationPlan::new([
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                    Step::Tap,
                    Step::Tap,
                    Step::TapBurst(12),
                    Step::wait_ms(POPUP_MS),
                ])
                .with_expectation(rapid_taps_expectation),
            ),
        ),
        (
            "replay",
            TestScenario::simulation(
                "Replay From Result",
                SimulationPlan::new([
                    Step::Draw,
                    Step::RevealAll,
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                    Step::RevealAll,
                ])
                .with_expectation(replay_expectation),
            ),
        ),
        (
            "teardown",
            TestScenario::simulation(
                "Teardown Mid-Reveal",
                SimulationPlan::new([
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                    Step::Tap,
                    Step::Tap,
                    Step::Teardown,
                    Step::wait_ms(3_000),
                ])
                .with_expectation(teardown_expectation),
            ),
        ),
        (
            "audio-blocked",
            TestScenario::simulation(
                "Blocked Ambient Audio",
                SimulationPlan::new([
                    Step::wait_ms(500),
                    Step::Interact,
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                ])
                .with_autoplay_restriction()
                .with_expectation(audio_blocked_expectation),
            ),
        ),
        (
            "redeem-offline",
            TestScenario::simulation(
                "Redemption Offline",
                SimulationPlan::new([
                    Step::Draw,
                    Step::RevealAll,
                    Step::redeem("0812", GatewayTarget::Unreachable),
                    Step::redeem("081-234-5678", GatewayTarget::Unreachable),
                ])
                .with_expectation(redeem_offline_expectation),
            ),
        ),
        (
            "redeem-online",
            TestScenario::simulation(
                "Redemption Round Trip",
                SimulationPlan::new([
                    Step::Draw,
                    Step::RevealAll,
                    Step::redeem("0812345678", GatewayTarget::Loopback),
                ])
                .with_expectation(redeem_online_expectation),
            ),
        ),
        (
            "clamp-guard",
            TestScenario::simulation(
                "Clip Window Clamp",
                SimulationPlan::new([
                    Step::Draw,
                    Step::wait_ms(WARMUP_MS),
                    Step::Tap,
                    Step::wait_ms(3_000),
                    Step::Tap,
                    Step::wait_ms(3_500),
                ])
                .with_expectation(clamp_guard_expectation),
            ),
        ),
    ]
}

pub fn find_catalog_scenario(key: &str) -> Option<TestScenario> {
    catalog_scenarios()
        .into_iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, scenario)| scenario)
}

pub fn catalog_keys() -> Vec<&'static str> {
    catalog_scenarios().into_iter().map(|(key, _)| key).collect()
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.phases == [SessionPhase::Main, SessionPhase::Preload, SessionPhase::Show],
        "unexpected phase path {:?}",
        summary.phases
    );
    let snapshot = &summary.final_snapshot;
    ensure!(snapshot.cursor.get() == 0, "SHOW must open at the intro");
    ensure!(
        snapshot.tap_prompt == Some(TapPrompt::Start),
        "intro should prompt to start"
    );
    let batch = snapshot.batch.as_ref().context("batch missing in SHOW")?;
    ensure!(batch.len() == 5, "batch must hold five rewards");
    ensure!(summary.camera_requests == 1, "camera handed over once");
    ensure!(
        summary.audio.active == Some(AudioChannel::Action) && summary.audio.action_playing,
        "SHOW plays the action track"
    );
    let defaults = AudioConfig::default();
    ensure!(
        summary.audio.looping
            && summary.audio.ambient_volume == defaults.ambient_volume
            && summary.audio.action_volume == defaults.action_volume,
        "tracks must loop at their configured volumes"
    );
    Ok(())
}

fn full_reveal_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.final_phase() == SessionPhase::Result,
        "reveal should end in RESULT"
    );
    let batch = summary.batches.first().context("no batch rolled")?;
    let popups = summary.popups();
    ensure!(popups.len() == 5, "expected 5 popups, saw {}", popups.len());
    for (slot, popup) in popups.iter().enumerate() {
        let reward = batch.get(slot).context("slot out of range")?;
        ensure!(
            popup.slot == slot && popup.payout == reward.payout && popup.tier == reward.tier,
            "popup {slot} does not match the batch"
        );
    }
    ensure!(
        summary.result_totals == [batch.total_payout()],
        "RESULT total {:?} should equal {}",
        summary.result_totals,
        batch.total_payout()
    );
    ensure!(
        summary.final_snapshot.total_payout == batch.total_payout(),
        "snapshot total drifted"
    );
    ensure!(
        summary.final_snapshot.characters.iter().all(|c| c.revealed),
        "every character should be revealed"
    );
    ensure!(summary.cursor_regressions == 0, "cursor moved backwards");
    ensure!(summary.clamped_channels > 0, "clips were never clamped");
    ensure!(
        summary.audio.ambient_playing && !summary.audio.action_playing,
        "RESULT plays the ambient track only"
    );
    Ok(())
}

fn rapid_taps_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.ignored_taps() == 12,
        "expected 12 ignored taps, saw {}",
        summary.ignored_taps()
    );
    ensure!(summary.popups().len() == 1, "only one popup may fire");
    ensure!(
        summary.final_snapshot.cursor.get() == 2,
        "cursor should advance exactly once"
    );
    let cleared = summary
        .timer_outcomes
        .iter()
        .filter(|outcome| matches!(outcome, TimerOutcome::PopupCleared { .. }))
        .count();
    ensure!(cleared == 1, "popup timer fired {cleared} times");
    Ok(())
}

fn replay_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.batches.len() == 2, "expected two draws");
    let expected: Vec<u32> = summary
        .batches
        .iter()
        .map(gacha_engine::RewardBatch::total_payout)
        .collect();
    ensure!(
        summary.result_totals == expected,
        "totals {:?} should follow each batch {:?}",
        summary.result_totals,
        expected
    );
    ensure!(summary.stale_timers() == 0, "replay left stale timers");
    ensure!(summary.cursor_regressions == 0, "cursor moved backwards");
    ensure!(
        summary
            .phases
            .windows(2)
            .any(|pair| pair == [SessionPhase::Result, SessionPhase::Preload]),
        "replay should go RESULT → PRELOAD"
    );
    let intro = RevealTimeline::default().window_for(0)?;
    ensure!(
        summary.intro_clip_times.len() == 2,
        "SHOW should open twice, saw {}",
        summary.intro_clip_times.len()
    );
    ensure!(
        summary
            .intro_clip_times
            .iter()
            .flatten()
            .all(|t| *t >= intro.start && *t <= intro.end),
        "replay clips {:?} should restart inside the intro window",
        summary.intro_clip_times
    );
    Ok(())
}

fn teardown_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.stale_timers() == 1,
        "the pending popup timer should be dropped as stale"
    );
    let snapshot = &summary.final_snapshot;
    ensure!(snapshot.phase == SessionPhase::Main, "torn-down session rests in MAIN");
    ensure!(snapshot.batch.is_none(), "batch must be discarded");
    ensure!(snapshot.cursor.get() == 0, "cursor must be cleared");
    ensure!(snapshot.popup.is_none(), "popup must not survive teardown");
    ensure!(
        summary.audio.active.is_none()
            && !summary.audio.ambient_playing
            && !summary.audio.action_playing,
        "audio must stop on teardown"
    );
    Ok(())
}

fn audio_blocked_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.audio.retries_fired == 1,
        "ambient retry fired {} times",
        summary.audio.retries_fired
    );
    ensure!(
        summary.audio.ambient_attempts >= 2,
        "ambient should have been retried"
    );
    ensure!(!summary.audio.retry_armed, "retry must be consumed");
    ensure!(
        summary.audio.action_playing && !summary.audio.ambient_playing,
        "SHOW plays the action track once unblocked"
    );
    Ok(())
}

fn redeem_offline_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.alerts == [Alert::InvalidPhone, Alert::ConnectionFailed],
        "unexpected alerts {:?}",
        summary.alerts
    );
    ensure!(summary.claims.len() == 1, "short number must not be sent");
    let claim = &summary.claims[0];
    let batch = summary.batches.first().context("no batch rolled")?;
    ensure!(claim.wallet_phone == "0812345678", "phone not sanitized");
    ensure!(claim.total_money == batch.total_payout(), "claim total drifted");
    ensure!(
        summary.final_phase() == SessionPhase::Result,
        "failed redemption keeps RESULT"
    );
    ensure!(summary.final_snapshot.redeem_open, "overlay stays open");
    Ok(())
}

fn redeem_online_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.alerts == [Alert::Submitted],
        "unexpected alerts {:?}",
        summary.alerts
    );
    ensure!(summary.claims.len() == 1, "one claim expected");
    ensure!(
        summary.endpoint_claims == 1,
        "endpoint recorded {} claims",
        summary.endpoint_claims
    );
    ensure!(
        summary.final_phase() == SessionPhase::Main,
        "successful redemption returns to MAIN"
    );
    ensure!(!summary.final_snapshot.redeem_open, "overlay closes");
    ensure!(summary.final_snapshot.batch.is_none(), "batch is discarded");
    Ok(())
}

fn clamp_guard_expectation(summary: &SimulationSummary) -> Result<()> {
    let window = RevealTimeline::default().window_for(2)?;
    ensure!(
        summary.final_snapshot.cursor.get() == 2,
        "cursor should be on the second character"
    );
    ensure!(summary.clips_paused, "clips should hold at the window end");
    ensure!(
        summary
            .clip_times
            .iter()
            .all(|time| (time - window.end).abs() < CLIP_TOLERANCE),
        "clips {:?} should rest at {}",
        summary.clip_times,
        window.end
    );
    ensure!(
        summary.clamped_channels == 2 * summary.clip_times.len(),
        "each channel clamps once per step (saw {})",
        summary.clamped_channels
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys = catalog_keys();
        let before = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), before);
        assert_eq!(before, 9);
    }

    #[test]
    fn every_scenario_has_expectations() {
        for (key, scenario) in catalog_scenarios() {
            assert!(
                !scenario.plan.expectations.is_empty(),
                "{key} has no expectations"
            );
        }
    }
}
