//! Two looping background tracks, exactly one of which follows the phase.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AudioConfig;
use crate::session::SessionPhase;

/// A `play()` attempt was refused until the user interacts with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("playback blocked until the next user interaction")]
pub struct PlaybackBlocked;

/// Audio collaborator for a single looping track.
pub trait AudioTrack {
    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackBlocked`] when the platform refuses autoplay.
    fn play(&mut self) -> Result<(), PlaybackBlocked>;
    fn pause(&mut self);
    /// Move the playhead, in seconds.
    fn seek(&mut self, seconds: f32);
    fn set_looping(&mut self, looping: bool);
    fn set_volume(&mut self, volume: f32);
}

/// Which track the current phase calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioChannel {
    /// Menu, loading, and result music.
    Ambient,
    /// Reveal music, SHOW only.
    Action,
}

impl AudioChannel {
    #[must_use]
    pub const fn for_phase(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Show => Self::Action,
            SessionPhase::Main | SessionPhase::Preload | SessionPhase::Result => Self::Ambient,
        }
    }
}

/// Keeps the ambient and action tracks mutually exclusive.
///
/// When the ambient track is blocked by an autoplay restriction a single
/// retry is armed; the next user interaction fires it and disarms it.
#[derive(Debug)]
pub struct AudioChannelController<A: AudioTrack> {
    ambient: A,
    action: A,
    active: Option<AudioChannel>,
    retry_armed: bool,
}

impl<A: AudioTrack> AudioChannelController<A> {
    /// Apply looping and volume settings and take ownership of both tracks.
    pub fn new(mut ambient: A, mut action: A, config: &AudioConfig) -> Self {
        ambient.set_looping(true);
        ambient.set_volume(config.ambient_volume);
        action.set_looping(true);
        action.set_volume(config.action_volume);
        Self {
            ambient,
            action,
            active: None,
            retry_armed: false,
        }
    }

    /// Switch tracks for a new phase.
    pub fn on_phase_change(&mut self, phase: SessionPhase) {
        let channel = AudioChannel::for_phase(phase);
        self.active = Some(channel);
        match channel {
            AudioChannel::Action => {
                self.retry_armed = false;
                self.ambient.pause();
                if self.action.play().is_err() {
                    log::warn!("action track blocked on entering {phase}");
                }
            }
            AudioChannel::Ambient => {
                self.action.pause();
                self.action.seek(0.0);
                if self.ambient.play().is_err() {
                    log::warn!("ambient track blocked on entering {phase}; retrying on next interaction");
                    self.retry_armed = true;
                }
            }
        }
    }

    /// Fire the pending ambient retry, if armed. Returns whether a retry ran.
    ///
    /// The retry only plays when ambient is still the active channel.
    pub fn on_user_interaction(&mut self) -> bool {
        if !self.retry_armed {
            return false;
        }
        self.retry_armed = false;
        if self.active != Some(AudioChannel::Ambient) {
            return false;
        }
        if self.ambient.play().is_err() {
            log::debug!("ambient retry was blocked again");
        }
        true
    }

    #[must_use]
    pub const fn retry_armed(&self) -> bool {
        self.retry_armed
    }

    #[must_use]
    pub const fn active(&self) -> Option<AudioChannel> {
        self.active
    }

    /// Stop both tracks and drop any pending retry.
    pub fn shutdown(&mut self) {
        self.ambient.pause();
        self.action.pause();
        self.retry_armed = false;
        self.active = None;
    }

    #[must_use]
    pub const fn ambient(&self) -> &A {
        &self.ambient
    }

    #[must_use]
    pub const fn action(&self) -> &A {
        &self.action
    }

    pub const fn ambient_mut(&mut self) -> &mut A {
        &mut self.ambient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Track {
        playing: bool,
        position: f32,
        looping: bool,
        volume: f32,
        blocked: bool,
        play_calls: u32,
    }

    impl AudioTrack for Track {
        fn play(&mut self) -> Result<(), PlaybackBlocked> {
            self.play_calls += 1;
            if self.blocked {
                return Err(PlaybackBlocked);
            }
            self.playing = true;
            Ok(())
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn seek(&mut self, seconds: f32) {
            self.position = seconds;
        }
        fn set_looping(&mut self, looping: bool) {
            self.looping = looping;
        }
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
    }

    fn controller() -> AudioChannelController<Track> {
        AudioChannelController::new(Track::default(), Track::default(), &AudioConfig::default())
    }

    #[test]
    fn construction_applies_persistent_settings() {
        let audio = controller();
        assert!(audio.ambient().looping && audio.action().looping);
        assert!((audio.ambient().volume - 0.3).abs() < f32::EPSILON);
        assert!((audio.action().volume - 0.5).abs() < f32::EPSILON);
        assert_eq!(audio.active(), None);
    }

    #[test]
    fn show_swaps_to_action_and_back() {
        let mut audio = controller();
        audio.on_phase_change(SessionPhase::Main);
        assert!(audio.ambient().playing);

        audio.on_phase_change(SessionPhase::Show);
        assert!(!audio.ambient().playing);
        assert!(audio.action().playing);
        assert_eq!(audio.active(), Some(AudioChannel::Action));

        audio.ambient_mut().position = 12.0;
        audio.on_phase_change(SessionPhase::Result);
        assert!(!audio.action().playing);
        assert!((audio.action().position - 0.0).abs() < f32::EPSILON);
        assert!(audio.ambient().playing);
    }

    #[test]
    fn blocked_ambient_retries_once_on_interaction() {
        let mut audio = controller();
        audio.ambient_mut().blocked = true;
        audio.on_phase_change(SessionPhase::Main);
        assert!(audio.retry_armed());
        assert!(!audio.ambient().playing);

        audio.ambient_mut().blocked = false;
        assert!(audio.on_user_interaction());
        assert!(audio.ambient().playing);
        assert!(!audio.retry_armed());

        let calls = audio.ambient().play_calls;
        assert!(!audio.on_user_interaction());
        assert_eq!(audio.ambient().play_calls, calls);
    }

    #[test]
    fn entering_show_drops_pending_ambient_retry() {
        let mut audio = controller();
        audio.ambient_mut().blocked = true;
        audio.on_phase_change(SessionPhase::Preload);
        assert!(audio.retry_armed());
        audio.on_phase_change(SessionPhase::Show);
        assert!(!audio.retry_armed());
        assert!(!audio.on_user_interaction());
    }

    #[test]
    fn blocked_action_is_swallowed() {
        let mut audio = controller();
        audio.action.blocked = true;
        audio.on_phase_change(SessionPhase::Show);
        assert!(!audio.action().playing);
        assert!(!audio.ambient().playing);
        assert!(!audio.retry_armed());
    }

    #[test]
    fn shutdown_silences_everything() {
        let mut audio = controller();
        audio.on_phase_change(SessionPhase::Show);
        audio.shutdown();
        assert!(!audio.ambient().playing && !audio.action().playing);
        assert_eq!(audio.active(), None);
    }
}
