//! Gacha Reveal Engine
//!
//! Platform-agnostic sequencing for a five-character gacha reveal: reward
//! rolls, the phase state machine, clip-window playback policy, and the
//! two-track audio policy. Rendering, audio output, timers, and networking
//! are supplied by the host through capability traits.

pub mod audio;
pub mod config;
pub mod constants;
pub mod numbers;
pub mod redeem;
pub mod reward;
pub mod scheduler;
pub mod session;
pub mod stage;
pub mod timeline;

// Re-export commonly used types
pub use audio::{AudioChannel, AudioChannelController, AudioTrack, PlaybackBlocked};
pub use config::{AudioConfig, ConfigError, GachaConfig, RedeemConfig, TimingConfig};
pub use redeem::{
    Alert, RedeemOverlay, RedemptionAck, RedemptionClaim, RedemptionError, sanitize_phone,
};
pub use reward::{PayoutRange, Reward, RewardBatch, RewardRoller, RollTable, Tier};
pub use scheduler::{Scheduler, TimerKind, TimerQueue, TimerTicket};
pub use session::{
    GachaSession, RevealCursor, RevealOutcome, RewardPopup, SessionError, SessionPhase,
    SessionSnapshot, TapPrompt, TimerOutcome,
};
pub use stage::{CharacterView, LightColor, LightCue, SpawnPoint, Stage};
pub use timeline::{AnimationChannel, AnimationMixer, RevealTimeline, TimelineError, TimelineWindow};

/// Source of session configuration.
/// Platform-specific implementations should provide this
pub trait ConfigLoader {
    type Error: std::error::Error + From<ConfigError> + Send + Sync + 'static;

    /// Load the raw configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or parsed.
    fn load_config(&self) -> Result<GachaConfig, Self::Error>;
}

/// Loader that always yields the built-in defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl ConfigLoader for DefaultConfig {
    type Error = ConfigError;

    fn load_config(&self) -> Result<GachaConfig, Self::Error> {
        Ok(GachaConfig::default())
    }
}

/// Loader backed by an in-memory JSON document.
#[derive(Debug, Clone)]
pub struct JsonConfig {
    source: String,
}

impl JsonConfig {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl ConfigLoader for JsonConfig {
    type Error = ConfigError;

    fn load_config(&self) -> Result<GachaConfig, Self::Error> {
        GachaConfig::from_json(&self.source)
    }
}

/// Entry point for hosts: validates configuration once and builds sessions.
pub struct GachaEngine<L>
where
    L: ConfigLoader,
{
    loader: L,
}

impl<L> GachaEngine<L>
where
    L: ConfigLoader,
{
    /// Create a new engine with the provided configuration loader
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Load and validate configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn config(&self) -> Result<GachaConfig, L::Error> {
        let config = self.loader.load_config()?;
        config.validate()?;
        Ok(config)
    }

    /// Construct a session in MAIN bound to the host's collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn create_session<S, A, T>(
        &self,
        seed: u64,
        stage: S,
        ambient: A,
        action: A,
        scheduler: T,
    ) -> Result<GachaSession<S, A, T>, L::Error>
    where
        S: Stage,
        A: AudioTrack,
        T: Scheduler,
    {
        let config = self.config()?;
        log::debug!("creating session with seed {seed:#x}");
        Ok(GachaSession::new(config, seed, stage, ambient, action, scheduler)?)
    }
}
