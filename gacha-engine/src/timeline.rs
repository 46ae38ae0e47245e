//! Reveal timeline: per-step clip windows and the playback policy that
//! confines stage animation to them.
//!
//! The window table is pure data. Playback control goes through the
//! [`AnimationMixer`] capability so the timeline never holds live handles.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{TIMELINE_FRAMES, TIMELINE_STEPS};
use crate::numbers::frames_to_seconds;

/// Raised when a step has no window. Indicates a cursor/window mismatch bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("reveal step {step} has no timeline window (expected 0..=5)")]
    OutOfRange { step: i32 },
}

/// Clip-local time interval, in seconds, that a step is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineWindow {
    pub start: f32,
    pub end: f32,
}

impl TimelineWindow {
    #[must_use]
    pub fn from_frames(start_frame: u32, end_frame: u32) -> Self {
        Self {
            start: frames_to_seconds(start_frame),
            end: frames_to_seconds(end_frame),
        }
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}

/// A single named animation track on the stage.
pub trait AnimationChannel {
    /// Rewind the channel and clear any finished state.
    fn reset(&mut self);
    /// Play through once and hold the last frame instead of looping.
    fn set_play_once_clamped(&mut self);
    fn seek(&mut self, time: f32);
    fn resume(&mut self);
    fn pause(&mut self);
    /// Current clip-local time in seconds.
    fn time(&self) -> f32;
    fn is_paused(&self) -> bool;
}

/// Renderer capability exposing the stage's animation channels by name.
pub trait AnimationMixer {
    fn channel_names(&self) -> Vec<String>;
    fn channel_mut(&mut self, name: &str) -> Option<&mut dyn AnimationChannel>;
}

/// Window table for the intro plus one window per character slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealTimeline {
    windows: [TimelineWindow; TIMELINE_STEPS],
}

impl Default for RevealTimeline {
    fn default() -> Self {
        Self {
            windows: TIMELINE_FRAMES.map(|(start, end)| TimelineWindow::from_frames(start, end)),
        }
    }
}

impl RevealTimeline {
    #[must_use]
    pub fn windows(&self) -> &[TimelineWindow] {
        &self.windows
    }

    /// Window for a reveal step.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::OutOfRange`] for any step outside `0..=5`.
    pub fn window_for(&self, step: i32) -> Result<TimelineWindow, TimelineError> {
        usize::try_from(step)
            .ok()
            .and_then(|index| self.windows.get(index))
            .copied()
            .ok_or(TimelineError::OutOfRange { step })
    }

    /// Restart every channel at the start of `step`'s window.
    ///
    /// Calling this twice for the same step leaves the stage in the same state.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::OutOfRange`] for any step outside `0..=5`.
    pub fn advance_to<M>(&self, step: i32, mixer: &mut M) -> Result<(), TimelineError>
    where
        M: AnimationMixer + ?Sized,
    {
        let window = self.window_for(step)?;
        for name in mixer.channel_names() {
            if let Some(channel) = mixer.channel_mut(&name) {
                channel.reset();
                channel.set_play_once_clamped();
                channel.seek(window.start);
                channel.resume();
            }
        }
        Ok(())
    }

    /// Pause any running channel that reached the end of `step`'s window and
    /// snap it exactly to the boundary. Returns how many channels were clamped.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::OutOfRange`] for any step outside `0..=5`.
    pub fn clamp_tick<M>(&self, step: i32, mixer: &mut M) -> Result<usize, TimelineError>
    where
        M: AnimationMixer + ?Sized,
    {
        let window = self.window_for(step)?;
        let mut clamped = 0;
        for name in mixer.channel_names() {
            let Some(channel) = mixer.channel_mut(&name) else {
                continue;
            };
            if channel.is_paused() || channel.time() < window.end {
                continue;
            }
            channel.pause();
            channel.seek(window.end);
            clamped += 1;
        }
        Ok(clamped)
    }
}
