//! Session state machine: MAIN → PRELOAD → SHOW → RESULT and back.
//!
//! All mutation happens on discrete triggers (a command, a delivered timer,
//! a frame tick) processed one at a time. Fixed delays go through the
//! injected [`Scheduler`] and are matched back against the session
//! generation, so a torn-down session ignores late timers.

mod cursor;
mod outcome;
mod phase;

pub use cursor::RevealCursor;
pub use outcome::{RevealOutcome, RewardPopup, SessionSnapshot, TapPrompt, TimerOutcome};
pub use phase::SessionPhase;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::audio::{AudioChannelController, AudioTrack};
use crate::config::{ConfigError, GachaConfig};
use crate::redeem::{Alert, RedeemOverlay, RedemptionAck, RedemptionClaim, RedemptionError};
use crate::reward::{RewardBatch, RewardRoller};
use crate::scheduler::{Scheduler, TimerKind, TimerTicket};
use crate::stage::{CharacterView, LightCue, Stage};
use crate::timeline::{RevealTimeline, TimelineError};

/// Errors raised by session commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{action} is not valid during {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Redemption(#[from] RedemptionError),
}

/// A single-user gacha session bound to its stage, audio, and timer host.
#[derive(Debug)]
pub struct GachaSession<S, A, T>
where
    S: Stage,
    A: AudioTrack,
    T: Scheduler,
{
    config: GachaConfig,
    roller: RewardRoller,
    timeline: RevealTimeline,
    stage: S,
    audio: AudioChannelController<A>,
    scheduler: T,
    rng: ChaCha20Rng,
    phase: SessionPhase,
    batch: Option<RewardBatch>,
    cursor: RevealCursor,
    processing: bool,
    popup: Option<RewardPopup>,
    generation: u64,
    camera_ready: bool,
    redeem: RedeemOverlay,
    alert: Option<Alert>,
}

impl<S, A, T> GachaSession<S, A, T>
where
    S: Stage,
    A: AudioTrack,
    T: Scheduler,
{
    /// Build a session in MAIN with ambient audio requested.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: GachaConfig,
        seed: u64,
        stage: S,
        ambient: A,
        action: A,
        scheduler: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let audio = AudioChannelController::new(ambient, action, &config.audio);
        let roller = RewardRoller::new(config.rolls.clone());
        let mut session = Self {
            config,
            roller,
            timeline: RevealTimeline::default(),
            stage,
            audio,
            scheduler,
            rng: ChaCha20Rng::seed_from_u64(seed),
            phase: SessionPhase::Main,
            batch: None,
            cursor: RevealCursor::INTRO,
            processing: false,
            popup: None,
            generation: 0,
            camera_ready: false,
            redeem: RedeemOverlay::default(),
            alert: None,
        };
        session.audio.on_phase_change(SessionPhase::Main);
        Ok(session)
    }

    /// Roll a fresh batch and enter PRELOAD; SHOW follows after the warm-up.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside MAIN and RESULT.
    pub fn start_draw(&mut self) -> Result<&RewardBatch, SessionError> {
        self.require(self.phase.accepts_draw(), "start_draw")?;
        let batch = self.roller.roll_batch(&mut self.rng);
        log::info!(
            "rolled batch [{}] total {}",
            batch
                .iter()
                .map(|reward| format!("{}:{}", reward.tier, reward.payout))
                .collect::<Vec<_>>()
                .join(", "),
            batch.total_payout()
        );
        self.generation += 1;
        self.cursor = RevealCursor::INTRO;
        self.processing = false;
        self.popup = None;
        self.redeem.close();
        self.enter_phase(SessionPhase::Preload);
        let warmup = self.config.timing.preload_warmup();
        self.scheduler
            .schedule(warmup, TimerTicket::new(self.generation, TimerKind::PreloadWarmup));
        Ok(self.batch.insert(batch))
    }

    /// Handle a tap on the stage.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside SHOW, or a
    /// timeline error if the cursor ever points past the window table.
    pub fn advance_reveal(&mut self) -> Result<RevealOutcome, SessionError> {
        self.require(self.phase == SessionPhase::Show, "advance_reveal")?;
        if self.processing {
            log::debug!("tap ignored while popup for cursor {} is showing", self.cursor.get());
            return Ok(RevealOutcome::Ignored);
        }

        if self.cursor == RevealCursor::INTRO {
            self.cursor.advance();
            self.timeline.advance_to(self.cursor.step(), &mut self.stage)?;
            return Ok(RevealOutcome::Started);
        }

        if let Some(slot) = self.cursor.slot()
            && let Some(reward) = self.batch.as_ref().and_then(|batch| batch.get(slot))
        {
            let popup = RewardPopup {
                slot,
                tier: reward.tier,
                payout: reward.payout,
            };
            self.processing = true;
            self.popup = Some(popup);
            let delay = self.config.timing.reward_popup();
            self.scheduler
                .schedule(delay, TimerTicket::new(self.generation, TimerKind::RewardPopup));
            return Ok(RevealOutcome::PopupShown(popup));
        }

        self.enter_phase(SessionPhase::Result);
        Ok(RevealOutcome::Finished {
            total: self.total_payout(),
        })
    }

    /// Deliver a fired timer.
    ///
    /// # Errors
    ///
    /// Returns a timeline error if the advanced cursor has no window.
    pub fn on_timer(&mut self, ticket: TimerTicket) -> Result<TimerOutcome, SessionError> {
        if ticket.generation() != self.generation {
            log::debug!(
                "dropping {:?} timer from generation {} (current {})",
                ticket.kind(),
                ticket.generation(),
                self.generation
            );
            return Ok(TimerOutcome::Stale);
        }
        match ticket.kind() {
            TimerKind::PreloadWarmup if self.phase == SessionPhase::Preload => {
                self.cursor = RevealCursor::INTRO;
                self.timeline.advance_to(self.cursor.step(), &mut self.stage)?;
                self.enter_phase(SessionPhase::Show);
                Ok(TimerOutcome::EnteredShow)
            }
            TimerKind::RewardPopup if self.processing => {
                self.popup = None;
                self.cursor.advance();
                if self.cursor.on_character() {
                    self.timeline.advance_to(self.cursor.step(), &mut self.stage)?;
                }
                self.processing = false;
                Ok(TimerOutcome::PopupCleared {
                    cursor: self.cursor,
                })
            }
            TimerKind::PreloadWarmup | TimerKind::RewardPopup => {
                log::debug!("{:?} timer no longer applies in {}", ticket.kind(), self.phase);
                Ok(TimerOutcome::Stale)
            }
        }
    }

    /// Per-frame hook from the render loop. Returns how many channels were
    /// clamped at the current window's end.
    ///
    /// # Errors
    ///
    /// Returns a timeline error if the cursor has no window.
    pub fn tick_frame(&mut self) -> Result<usize, SessionError> {
        if self.phase != SessionPhase::Show || !self.cursor.on_character() {
            return Ok(0);
        }
        Ok(self.timeline.clamp_tick(self.cursor.step(), &mut self.stage)?)
    }

    /// Leave RESULT for the menu, discarding the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside RESULT.
    pub fn return_to_main(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == SessionPhase::Result, "return_to_main")?;
        self.discard_batch();
        self.enter_phase(SessionPhase::Main);
        Ok(())
    }

    /// Stage assets resolved; hand over the authored camera once.
    pub fn on_stage_ready(&mut self) {
        if self.camera_ready {
            return;
        }
        self.camera_ready = true;
        if !self.stage.provide_camera() {
            log::warn!("stage has no authored camera; keeping the default view");
        }
    }

    /// Any click or tap anywhere; fires the deferred ambient retry if armed.
    pub fn on_user_interaction(&mut self) -> bool {
        self.audio.on_user_interaction()
    }

    /// Tear the session down: outstanding timers become stale and audio stops.
    pub fn teardown(&mut self) {
        self.discard_batch();
        self.phase = SessionPhase::Main;
        self.alert = None;
        self.audio.shutdown();
        log::debug!("session torn down at generation {}", self.generation);
    }

    /// Open the redemption overlay.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside RESULT.
    pub fn open_redeem(&mut self) -> Result<(), SessionError> {
        self.require(self.phase == SessionPhase::Result, "open_redeem")?;
        self.redeem.open();
        Ok(())
    }

    pub fn close_redeem(&mut self) {
        self.redeem.close();
    }

    /// Update the phone field; input is reduced to digits and truncated.
    pub fn edit_phone(&mut self, raw: &str) {
        self.redeem.edit_phone(raw, &self.config.redeem);
    }

    /// Build the claim to hand to the redemption gateway.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless RESULT is active
    /// with the overlay open, or [`RedemptionError::InvalidPhone`] (also
    /// raised as [`Alert::InvalidPhone`]) when the number is too short.
    pub fn submit_redeem(&mut self) -> Result<RedemptionClaim, SessionError> {
        self.require(
            self.phase == SessionPhase::Result && self.redeem.is_open(),
            "submit_redeem",
        )?;
        match self.redeem.claim(self.total_payout(), &self.config.redeem) {
            Ok(claim) => {
                log::info!("submitting claim of {} for {}", claim.total_money, claim.wallet_phone);
                Ok(claim)
            }
            Err(err) => {
                self.alert = Some(Alert::InvalidPhone);
                Err(err.into())
            }
        }
    }

    /// Report the gateway's answer for a submitted claim.
    ///
    /// Success closes the overlay and returns to MAIN; any failure keeps
    /// RESULT as it was and raises [`Alert::ConnectionFailed`].
    pub fn finish_redeem(&mut self, result: Result<RedemptionAck, RedemptionError>) -> Alert {
        let alert = match result {
            Ok(ack) if self.phase == SessionPhase::Result => {
                log::info!("redemption acknowledged ({})", ack.status);
                self.discard_batch();
                self.enter_phase(SessionPhase::Main);
                Alert::Submitted
            }
            Ok(ack) => {
                log::debug!(
                    "late redemption acknowledgment ({}) in {}; state unchanged",
                    ack.status,
                    self.phase
                );
                Alert::Submitted
            }
            Err(err) => {
                log::warn!("redemption failed: {err}");
                Alert::ConnectionFailed
            }
        };
        self.alert = Some(alert);
        alert
    }

    /// Sum of every payout in the current batch, or 0 without one.
    #[must_use]
    pub fn total_payout(&self) -> u32 {
        self.batch.as_ref().map_or(0, RewardBatch::total_payout)
    }

    /// Presentation for each character slot of the current batch.
    #[must_use]
    pub fn characters(&self) -> Vec<CharacterView> {
        let Some(batch) = self.batch.as_ref() else {
            return Vec::new();
        };
        batch
            .iter()
            .enumerate()
            .map(|(slot, reward)| CharacterView {
                slot,
                tier: reward.tier,
                revealed: self.cursor.has_revealed(slot),
                spawn: self.stage.spawn_point(slot),
                light: LightCue::for_tier(reward.tier),
            })
            .collect()
    }

    /// Prompt shown over the stage, only while SHOW waits for a tap.
    #[must_use]
    pub fn tap_prompt(&self) -> Option<TapPrompt> {
        if self.phase != SessionPhase::Show || self.popup.is_some() {
            return None;
        }
        if self.cursor == RevealCursor::INTRO {
            Some(TapPrompt::Start)
        } else {
            Some(TapPrompt::Next)
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            cursor: self.cursor,
            processing: self.processing,
            popup: self.popup,
            batch: self.batch.clone(),
            total_payout: self.total_payout(),
            characters: self.characters(),
            tap_prompt: self.tap_prompt(),
            redeem_open: self.redeem.is_open(),
            alert: self.alert,
        }
    }

    /// Take the pending alert, clearing it.
    pub const fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }

    /// Reseed the roll stream. Takes effect on the next draw.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn cursor(&self) -> RevealCursor {
        self.cursor
    }

    #[must_use]
    pub const fn batch(&self) -> Option<&RewardBatch> {
        self.batch.as_ref()
    }

    #[must_use]
    pub const fn popup(&self) -> Option<RewardPopup> {
        self.popup
    }

    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn alert(&self) -> Option<Alert> {
        self.alert
    }

    #[must_use]
    pub const fn redeem(&self) -> &RedeemOverlay {
        &self.redeem
    }

    #[must_use]
    pub const fn config(&self) -> &GachaConfig {
        &self.config
    }

    #[must_use]
    pub const fn timeline(&self) -> &RevealTimeline {
        &self.timeline
    }

    #[must_use]
    pub const fn stage(&self) -> &S {
        &self.stage
    }

    pub const fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    #[must_use]
    pub const fn audio(&self) -> &AudioChannelController<A> {
        &self.audio
    }

    pub const fn audio_mut(&mut self) -> &mut AudioChannelController<A> {
        &mut self.audio
    }

    #[must_use]
    pub const fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub const fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), SessionError> {
        if allowed {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    fn discard_batch(&mut self) {
        self.generation += 1;
        self.batch = None;
        self.cursor = RevealCursor::INTRO;
        self.processing = false;
        self.popup = None;
        self.redeem.reset();
    }

    fn enter_phase(&mut self, phase: SessionPhase) {
        log::debug!("phase {} -> {phase}", self.phase);
        self.phase = phase;
        self.audio.on_phase_change(phase);
    }
}
