//! Headless stand-ins for the renderer and audio output.
//!
//! The stage advances its clips on a virtual clock and the audio tracks
//! model the browser autoplay rule: `play()` is refused until the user has
//! interacted with the page at least once.
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use gacha_engine::constants::{SPAWN_NODE_NAMES, TIMELINE_FRAMES};
use gacha_engine::numbers::frames_to_seconds;
use gacha_engine::{AnimationChannel, AnimationMixer, AudioTrack, PlaybackBlocked, SpawnPoint, Stage};

const CHANNEL_NAMES: [&str; 3] = ["CameraAction", "CharacterAction", "LightAction"];
const SPAWN_SPACING: f32 = 2.0;

/// One animation clip on the headless stage.
#[derive(Debug, Clone, Default)]
pub struct HeadlessClip {
    time: f32,
    paused: bool,
    clamp_at_end: bool,
    duration: f32,
}

impl HeadlessClip {
    fn new(duration: f32) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    fn advance(&mut self, seconds: f32) {
        if self.paused {
            return;
        }
        self.time += seconds;
        if self.time >= self.duration {
            if self.clamp_at_end {
                self.time = self.duration;
                self.paused = true;
            } else {
                self.time = self.time.rem_euclid(self.duration);
            }
        }
    }
}

impl AnimationChannel for HeadlessClip {
    fn reset(&mut self) {
        self.time = 0.0;
        self.paused = false;
    }

    fn set_play_once_clamped(&mut self) {
        self.clamp_at_end = true;
    }

    fn seek(&mut self, time: f32) {
        self.time = time;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Stage with a few named clips, five spawn nodes, and an authored camera.
#[derive(Debug, Clone)]
pub struct HeadlessStage {
    clips: BTreeMap<String, HeadlessClip>,
    nodes: BTreeMap<&'static str, SpawnPoint>,
    camera_requests: u32,
}

impl HeadlessStage {
    #[must_use]
    pub fn new() -> Self {
        let clip_end = TIMELINE_FRAMES
            .last()
            .map_or(0.0, |(_, end)| frames_to_seconds(*end));
        let clips = CHANNEL_NAMES
            .into_iter()
            .map(|name| (name.to_string(), HeadlessClip::new(clip_end)))
            .collect();
        let nodes = SPAWN_NODE_NAMES
            .into_iter()
            .zip(-2_i8..)
            .map(|(name, offset)| {
                let spawn = SpawnPoint {
                    position: [f32::from(offset) * SPAWN_SPACING, 0.0, 0.0],
                    rotation: [0.0, std::f32::consts::PI, 0.0],
                };
                (name, spawn)
            })
            .collect();
        Self {
            clips,
            nodes,
            camera_requests: 0,
        }
    }

    /// Run every unpaused clip forward.
    pub fn advance(&mut self, seconds: f32) {
        for clip in self.clips.values_mut() {
            clip.advance(seconds);
        }
    }

    /// Clip-local times, in channel-name order.
    #[must_use]
    pub fn clip_times(&self) -> Vec<f32> {
        self.clips.values().map(HeadlessClip::time).collect()
    }

    #[must_use]
    pub fn all_paused(&self) -> bool {
        self.clips.values().all(HeadlessClip::is_paused)
    }

    #[must_use]
    pub const fn camera_requests(&self) -> u32 {
        self.camera_requests
    }
}

impl Default for HeadlessStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationMixer for HeadlessStage {
    fn channel_names(&self) -> Vec<String> {
        self.clips.keys().cloned().collect()
    }

    fn channel_mut(&mut self, name: &str) -> Option<&mut dyn AnimationChannel> {
        self.clips
            .get_mut(name)
            .map(|clip| clip as &mut dyn AnimationChannel)
    }
}

impl Stage for HeadlessStage {
    fn spawn_point(&self, slot: usize) -> Option<SpawnPoint> {
        let name = SPAWN_NODE_NAMES.get(slot)?;
        self.nodes.get(name).copied()
    }

    fn provide_camera(&mut self) -> bool {
        self.camera_requests += 1;
        true
    }
}

/// Shared "page" state: whether the user has interacted yet.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPage {
    activated: Rc<Cell<bool>>,
    autoplay_restricted: bool,
}

impl HeadlessPage {
    /// A page where audio may start without a gesture.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// A page that refuses playback until the first user gesture.
    #[must_use]
    pub fn restricted() -> Self {
        Self {
            activated: Rc::default(),
            autoplay_restricted: true,
        }
    }

    /// Record a user gesture.
    pub fn activate(&self) {
        self.activated.set(true);
    }

    #[must_use]
    pub fn track(&self, label: &'static str) -> HeadlessTrack {
        HeadlessTrack {
            label,
            page: self.clone(),
            playing: false,
            looping: false,
            volume: 1.0,
            play_attempts: 0,
        }
    }

    fn allows_playback(&self) -> bool {
        !self.autoplay_restricted || self.activated.get()
    }
}

/// Looping background track bound to a [`HeadlessPage`].
#[derive(Debug, Clone)]
pub struct HeadlessTrack {
    label: &'static str,
    page: HeadlessPage,
    playing: bool,
    looping: bool,
    volume: f32,
    play_attempts: u32,
}

impl HeadlessTrack {
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    #[must_use]
    pub const fn play_attempts(&self) -> u32 {
        self.play_attempts
    }
}

impl AudioTrack for HeadlessTrack {
    fn play(&mut self) -> Result<(), PlaybackBlocked> {
        self.play_attempts += 1;
        if !self.page.allows_playback() {
            log::debug!("{} refused: no user gesture yet", self.label);
            return Err(PlaybackBlocked);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, _seconds: f32) {}

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_clip_holds_last_frame() {
        let mut stage = HeadlessStage::new();
        for name in stage.channel_names() {
            stage
                .channel_mut(&name)
                .expect("channel")
                .set_play_once_clamped();
        }
        stage.advance(100.0);
        assert!(stage.all_paused());
        let end = frames_to_seconds(420);
        assert!(stage.clip_times().iter().all(|t| (t - end).abs() < 1e-4));
    }

    #[test]
    fn restricted_page_blocks_until_gesture() {
        let page = HeadlessPage::restricted();
        let mut track = page.track("ambient");
        assert_eq!(track.play(), Err(PlaybackBlocked));
        page.activate();
        assert_eq!(track.play(), Ok(()));
        assert!(track.is_playing());
        assert_eq!(track.play_attempts(), 2);
    }

    #[test]
    fn spawn_nodes_cover_every_slot() {
        let stage = HeadlessStage::new();
        let xs: Vec<f32> = (0..SPAWN_NODE_NAMES.len())
            .map(|slot| stage.spawn_point(slot).expect("spawn").position[0])
            .collect();
        assert_eq!(xs, vec![-4.0, -2.0, 0.0, 2.0, 4.0]);
        assert!(stage.spawn_point(SPAWN_NODE_NAMES.len()).is_none());
    }
}
