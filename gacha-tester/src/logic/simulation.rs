use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use gacha_engine::numbers::duration_to_secs_f32;
use gacha_engine::{
    Alert, AudioChannel, ConfigError, GachaConfig, GachaSession, RedemptionAck, RedemptionClaim,
    RedemptionError, RevealCursor, RevealOutcome, RewardBatch, RewardPopup, SessionPhase,
    SessionSnapshot, TimerOutcome, TimerQueue, TimerTicket,
};

use crate::headless::{HeadlessPage, HeadlessStage, HeadlessTrack};
use crate::redeem::{HttpRedemptionGateway, RedemptionGateway, RedemptionServer};

/// One virtual frame at 60 fps.
pub const FRAME: Duration = Duration::from_micros(16_667);
/// Pause after each tap so the stage plays into the step's window.
const TAP_SETTLE: Duration = Duration::from_millis(500);
const REVEAL_POLL: Duration = Duration::from_millis(100);
const MAX_REVEAL_ITERATIONS: usize = 400;
/// Loopback port nothing listens on; connecting fails immediately.
const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:1/redeem";

pub type HeadlessSession = GachaSession<HeadlessStage, HeadlessTrack, TimerQueue>;

/// Where a redemption step sends its claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayTarget {
    /// A port with no listener: the claim fails in transport.
    Unreachable,
    /// An endpoint spawned on loopback for the duration of the step.
    Loopback,
}

/// A single user- or host-level action applied to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    StageReady,
    Draw,
    Wait(Duration),
    Tap,
    /// Several taps in the same frame.
    TapBurst(usize),
    /// Tap through every reveal, waiting out popups, until RESULT.
    RevealAll,
    /// A click somewhere that is not a control.
    Interact,
    ReturnToMain,
    Teardown,
    Redeem {
        phone: String,
        target: GatewayTarget,
    },
}

impl Step {
    #[must_use]
    pub const fn wait_ms(millis: u64) -> Self {
        Self::Wait(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn redeem(phone: &str, target: GatewayTarget) -> Self {
        Self::Redeem {
            phone: phone.to_string(),
            target,
        }
    }
}

/// Declarative plan for running a headless session.
#[derive(Debug, Clone, Default)]
pub struct SimulationPlan {
    pub steps: Vec<Step>,
    pub config: Option<GachaConfig>,
    pub autoplay_restricted: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GachaConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub const fn with_autoplay_restriction(mut self) -> Self {
        self.autoplay_restricted = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Audio state at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSummary {
    pub active: Option<AudioChannel>,
    pub ambient_playing: bool,
    pub action_playing: bool,
    pub ambient_attempts: u32,
    pub retry_armed: bool,
    pub retries_fired: usize,
    pub ambient_volume: f32,
    pub action_volume: f32,
    pub looping: bool,
}

/// Complete record of a headless run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub batches: Vec<RewardBatch>,
    pub phases: Vec<SessionPhase>,
    pub reveal_outcomes: Vec<RevealOutcome>,
    pub timer_outcomes: Vec<TimerOutcome>,
    pub result_totals: Vec<u32>,
    pub clamped_channels: usize,
    pub cursor_regressions: usize,
    pub claims: Vec<RedemptionClaim>,
    /// Claims a loopback endpoint actually recorded.
    pub endpoint_claims: usize,
    pub alerts: Vec<Alert>,
    pub errors: Vec<String>,
    pub audio: AudioSummary,
    pub camera_requests: u32,
    pub clip_times: Vec<f32>,
    pub clips_paused: bool,
    pub frames: u64,
    /// Clip times captured each time SHOW opened at the intro.
    pub intro_clip_times: Vec<Vec<f32>>,
    pub virtual_elapsed: Duration,
    pub final_snapshot: SessionSnapshot,
}

impl SimulationSummary {
    /// Popups surfaced over the run, in order.
    #[must_use]
    pub fn popups(&self) -> Vec<RewardPopup> {
        self.reveal_outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                RevealOutcome::PopupShown(popup) => Some(*popup),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn ignored_taps(&self) -> usize {
        self.reveal_outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RevealOutcome::Ignored))
            .count()
    }

    #[must_use]
    pub fn stale_timers(&self) -> usize {
        self.timer_outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TimerOutcome::Stale))
            .count()
    }

    #[must_use]
    pub fn final_phase(&self) -> SessionPhase {
        self.final_snapshot.phase
    }
}

/// Drives one [`HeadlessSession`] through a plan on a virtual clock.
pub struct SimulationRunner {
    session: HeadlessSession,
    page: HeadlessPage,
    seed: u64,
    verbose: bool,
    batches: Vec<RewardBatch>,
    phases: Vec<SessionPhase>,
    reveal_outcomes: Vec<RevealOutcome>,
    timer_outcomes: Vec<TimerOutcome>,
    result_totals: Vec<u32>,
    clamped_channels: usize,
    cursor_regressions: usize,
    last_cursor: RevealCursor,
    claims: Vec<RedemptionClaim>,
    endpoint_claims: usize,
    alerts: Vec<Alert>,
    errors: Vec<String>,
    retries_fired: usize,
    frames: u64,
    intro_clip_times: Vec<Vec<f32>>,
}

impl SimulationRunner {
    /// Build a runner around a fresh headless session.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: GachaConfig,
        seed: u64,
        autoplay_restricted: bool,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let page = if autoplay_restricted {
            HeadlessPage::restricted()
        } else {
            HeadlessPage::permissive()
        };
        let session = GachaSession::new(
            config,
            seed,
            HeadlessStage::new(),
            page.track("ambient"),
            page.track("action"),
            TimerQueue::new(),
        )?;
        let phases = vec![session.phase()];
        Ok(Self {
            session,
            page,
            seed,
            verbose,
            batches: Vec::new(),
            phases,
            reveal_outcomes: Vec::new(),
            timer_outcomes: Vec::new(),
            result_totals: Vec::new(),
            clamped_channels: 0,
            cursor_regressions: 0,
            last_cursor: RevealCursor::INTRO,
            claims: Vec::new(),
            endpoint_claims: 0,
            alerts: Vec::new(),
            errors: Vec::new(),
            retries_fired: 0,
            frames: 0,
            intro_clip_times: Vec::new(),
        })
    }

    /// Apply every step of `plan` in order.
    pub async fn run(&mut self, plan: &SimulationPlan) {
        for step in &plan.steps {
            self.apply(step).await;
        }
    }

    pub async fn apply(&mut self, step: &Step) {
        if self.verbose {
            println!("    ▸ {step:?} ({} @ {:?})", self.session.phase(), self.now());
        }
        match step {
            Step::StageReady => self.session.on_stage_ready(),
            Step::Draw => self.draw(),
            Step::Wait(duration) => self.advance(*duration),
            Step::Tap => self.tap(),
            Step::TapBurst(count) => {
                for _ in 0..*count {
                    self.tap();
                }
            }
            Step::RevealAll => self.reveal_all(),
            Step::Interact => self.interact(),
            Step::ReturnToMain => {
                self.interact();
                if let Err(err) = self.session.return_to_main() {
                    self.errors.push(err.to_string());
                }
            }
            Step::Teardown => self.session.teardown(),
            Step::Redeem { phone, target } => self.redeem(phone, *target).await,
        }
        self.observe();
        if let Some(alert) = self.session.take_alert() {
            self.alerts.push(alert);
        }
    }

    /// Consume the runner and summarize what happened.
    #[must_use]
    pub fn finish(self) -> SimulationSummary {
        let audio = self.session.audio();
        let audio = AudioSummary {
            active: audio.active(),
            ambient_playing: audio.ambient().is_playing(),
            action_playing: audio.action().is_playing(),
            ambient_attempts: audio.ambient().play_attempts(),
            retry_armed: audio.retry_armed(),
            retries_fired: self.retries_fired,
            ambient_volume: audio.ambient().volume(),
            action_volume: audio.action().volume(),
            looping: audio.ambient().is_looping() && audio.action().is_looping(),
        };
        let stage = self.session.stage();
        let virtual_elapsed = self.now();
        let final_snapshot = self.session.snapshot();
        SimulationSummary {
            seed: self.seed,
            batches: self.batches,
            phases: self.phases,
            reveal_outcomes: self.reveal_outcomes,
            timer_outcomes: self.timer_outcomes,
            result_totals: self.result_totals,
            clamped_channels: self.clamped_channels,
            cursor_regressions: self.cursor_regressions,
            claims: self.claims,
            endpoint_claims: self.endpoint_claims,
            alerts: self.alerts,
            errors: self.errors,
            audio,
            camera_requests: stage.camera_requests(),
            clip_times: stage.clip_times(),
            clips_paused: stage.all_paused(),
            frames: self.frames,
            intro_clip_times: self.intro_clip_times,
            virtual_elapsed,
            final_snapshot,
        }
    }

    fn now(&self) -> Duration {
        self.session.scheduler().now()
    }

    fn interact(&mut self) {
        self.page.activate();
        if self.session.on_user_interaction() {
            self.retries_fired += 1;
        }
    }

    fn draw(&mut self) {
        self.interact();
        match self.session.start_draw() {
            Ok(batch) => {
                let batch = batch.clone();
                if self.verbose {
                    let tags: Vec<_> = batch.iter().map(|reward| reward.label()).collect();
                    println!("    🎲 rolled {} (total {})", tags.join(", "), batch.total_payout());
                }
                self.batches.push(batch);
            }
            Err(err) => self.errors.push(err.to_string()),
        }
        self.observe();
    }

    fn tap(&mut self) {
        self.interact();
        match self.session.advance_reveal() {
            Ok(outcome) => {
                if let RevealOutcome::Finished { total } = outcome {
                    self.result_totals.push(total);
                }
                self.reveal_outcomes.push(outcome);
            }
            Err(err) => self.errors.push(err.to_string()),
        }
        self.observe();
    }

    fn reveal_all(&mut self) {
        for _ in 0..MAX_REVEAL_ITERATIONS {
            match self.session.phase() {
                SessionPhase::Result => return,
                SessionPhase::Show if !self.session.is_processing() => {
                    self.tap();
                    self.advance(TAP_SETTLE);
                }
                SessionPhase::Show | SessionPhase::Preload => self.advance(REVEAL_POLL),
                SessionPhase::Main => {
                    self.errors
                        .push("reveal requested with no draw in progress".to_string());
                    return;
                }
            }
        }
        self.errors.push(format!(
            "reveal did not reach RESULT (cursor {})",
            self.session.cursor().get()
        ));
    }

    /// Run the virtual clock forward frame by frame: stage clips advance,
    /// due timers fire, then the per-frame clamp runs.
    fn advance(&mut self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() {
            let step = remaining.min(FRAME);
            remaining -= step;
            self.session.stage_mut().advance(duration_to_secs_f32(step));
            let due = self.session.scheduler_mut().advance_by(step);
            for ticket in due {
                self.deliver(ticket);
            }
            match self.session.tick_frame() {
                Ok(clamped) => self.clamped_channels += clamped,
                Err(err) => self.errors.push(err.to_string()),
            }
            self.frames += 1;
            self.observe();
        }
    }

    fn deliver(&mut self, ticket: TimerTicket) {
        match self.session.on_timer(ticket) {
            Ok(outcome) => {
                if outcome == TimerOutcome::EnteredShow {
                    self.intro_clip_times.push(self.session.stage().clip_times());
                }
                self.timer_outcomes.push(outcome);
            }
            Err(err) => self.errors.push(err.to_string()),
        }
    }

    async fn redeem(&mut self, phone: &str, target: GatewayTarget) {
        self.interact();
        if let Err(err) = self.session.open_redeem() {
            self.errors.push(err.to_string());
            return;
        }
        self.session.edit_phone(phone);
        let Ok(claim) = self.session.submit_redeem() else {
            log::debug!("claim rejected locally for phone {phone:?}");
            return;
        };
        self.claims.push(claim.clone());

        let result = match target {
            GatewayTarget::Unreachable => deliver_claim(UNREACHABLE_ENDPOINT, &claim).await,
            GatewayTarget::Loopback => match RedemptionServer::spawn(([127, 0, 0, 1], 0).into()) {
                Ok(server) => {
                    let result = deliver_claim(&server.redeem_url(), &claim).await;
                    self.endpoint_claims += server.claims().len();
                    if let Err(err) = server.shutdown().await {
                        log::warn!("loopback endpoint did not stop cleanly: {err:#}");
                    }
                    result
                }
                Err(err) => Err(RedemptionError::Transport(format!("{err:#}"))),
            },
        };
        self.session.finish_redeem(result);
    }

    fn observe(&mut self) {
        let phase = self.session.phase();
        let cursor = self.session.cursor();
        let previous = self.phases.last().copied();
        if phase == SessionPhase::Show
            && previous == Some(SessionPhase::Show)
            && cursor < self.last_cursor
        {
            self.cursor_regressions += 1;
        }
        if previous != Some(phase) {
            self.phases.push(phase);
        }
        self.last_cursor = cursor;
    }
}

async fn deliver_claim(
    endpoint: &str,
    claim: &RedemptionClaim,
) -> Result<RedemptionAck, RedemptionError> {
    let gateway = HttpRedemptionGateway::new(endpoint)?;
    gateway.redeem(claim).await
}

/// Run `plan` once with `seed` and return the summary.
///
/// # Errors
///
/// Returns an error if the plan's configuration is invalid.
pub async fn run_plan(
    plan: &SimulationPlan,
    base_config: &GachaConfig,
    seed: u64,
    verbose: bool,
) -> Result<SimulationSummary> {
    let config = plan.config.clone().unwrap_or_else(|| base_config.clone());
    let mut runner = SimulationRunner::new(config, seed, plan.autoplay_restricted, verbose)
        .context("simulation config rejected")?;
    runner.run(plan).await;
    Ok(runner.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(steps: impl IntoIterator<Item = Step>) -> SimulationPlan {
        SimulationPlan::new(steps)
    }

    #[tokio::test]
    async fn warmup_hands_over_to_show() {
        let summary = run_plan(
            &plan([Step::StageReady, Step::Draw, Step::wait_ms(2_000)]),
            &GachaConfig::default(),
            7,
            false,
        )
        .await
        .expect("valid plan");
        assert_eq!(
            summary.phases,
            vec![SessionPhase::Main, SessionPhase::Preload, SessionPhase::Show]
        );
        assert_eq!(summary.timer_outcomes, vec![TimerOutcome::EnteredShow]);
        assert_eq!(summary.camera_requests, 1);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn reveal_all_reaches_result_with_matching_total() {
        let summary = run_plan(
            &plan([Step::Draw, Step::RevealAll]),
            &GachaConfig::default(),
            11,
            false,
        )
        .await
        .expect("valid plan");
        assert_eq!(summary.final_phase(), SessionPhase::Result);
        assert_eq!(summary.popups().len(), 5);
        assert_eq!(
            summary.result_totals,
            vec![summary.batches[0].total_payout()]
        );
        assert_eq!(summary.cursor_regressions, 0);
        assert!(summary.clamped_channels > 0);
    }

    #[tokio::test]
    async fn runner_counts_frames_on_the_virtual_clock() {
        let mut runner =
            SimulationRunner::new(GachaConfig::default(), 1, false, false).expect("valid config");
        runner.apply(&Step::wait_ms(1_000)).await;
        let summary = runner.finish();
        assert_eq!(summary.final_phase(), SessionPhase::Main);
        assert_eq!(summary.frames, 60);
        assert_eq!(summary.virtual_elapsed, Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn invalid_plan_config_is_reported_not_run() {
        let mut config = GachaConfig::default();
        config.rolls.rare = gacha_engine::PayoutRange::new(30, 10);
        let plan = plan([Step::Draw]).with_config(config);
        let err = run_plan(&plan, &GachaConfig::default(), 1, false)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("simulation config rejected"));
    }

    #[tokio::test]
    async fn replay_reopens_show_at_the_intro_window() {
        let summary = run_plan(
            &plan([Step::Draw, Step::RevealAll, Step::Draw, Step::wait_ms(2_000)]),
            &GachaConfig::default(),
            5,
            false,
        )
        .await
        .expect("valid plan");
        assert_eq!(summary.intro_clip_times.len(), 2);
        let intro = gacha_engine::RevealTimeline::default().window_for(0).unwrap();
        for times in &summary.intro_clip_times {
            assert!(times.iter().all(|t| *t >= intro.start && *t <= intro.end));
        }
        assert!(!summary.clips_paused);
    }

    #[tokio::test]
    async fn tapping_outside_show_is_recorded_as_error() {
        let summary = run_plan(&plan([Step::Tap]), &GachaConfig::default(), 3, false)
            .await
            .expect("valid plan");
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("advance_reveal"));
    }
}
