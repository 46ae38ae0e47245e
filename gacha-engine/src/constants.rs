//! Centralized tuning constants for the gacha reveal sequence.
//!
//! The frame table and batch shape are authored alongside the stage clip and
//! only change when the clip is re-exported, so they live here rather than in
//! runtime configuration.

// Batch shape ---------------------------------------------------------------
/// Number of rewards (and character slots) produced by one draw.
pub const BATCH_SIZE: usize = 5;
/// Highest reveal step that owns a timeline window.
pub const LAST_REVEAL_STEP: u8 = 5;
/// Cursor value reached once every slot has been revealed and acknowledged.
pub const CURSOR_DONE: u8 = 6;

// Stage clip ----------------------------------------------------------------
/// Frame rate the stage clip was authored at.
pub const CLIP_FPS: u32 = 30;
/// Intro window plus one window per character slot.
pub const TIMELINE_STEPS: usize = BATCH_SIZE + 1;
/// Inclusive frame ranges per reveal step: intro, then one per character slot.
pub const TIMELINE_FRAMES: [(u32, u32); TIMELINE_STEPS] = [
    (0, 260),
    (261, 300),
    (301, 330),
    (331, 360),
    (361, 390),
    (391, 420),
];
/// Stage nodes that carry the spawn transform for each character slot.
pub const SPAWN_NODE_NAMES: [&str; BATCH_SIZE] = ["Char1", "Char2", "Char3", "Char4", "Char5"];

// Roll table defaults -------------------------------------------------------
/// Exclusive upper bound of the uniform draw.
pub const DRAW_SCALE: f64 = 100.0;
pub(crate) const SUPER_RARE_BELOW: f64 = 2.0;
pub(crate) const RARE_BELOW: f64 = 15.0;
pub(crate) const SUPER_RARE_PAYOUT: (u32, u32) = (100, 150);
pub(crate) const RARE_PAYOUT: (u32, u32) = (10, 30);
pub(crate) const COMMON_PAYOUT: (u32, u32) = (1, 6);

// Timing defaults -----------------------------------------------------------
pub(crate) const PRELOAD_WARMUP_MS: u64 = 2_000;
pub(crate) const REWARD_POPUP_MS: u64 = 1_500;

// Audio defaults ------------------------------------------------------------
pub(crate) const AMBIENT_VOLUME: f32 = 0.3;
pub(crate) const ACTION_VOLUME: f32 = 0.5;

// Redemption defaults -------------------------------------------------------
pub(crate) const REDEEM_ENDPOINT: &str = "http://127.0.0.1:3001/redeem";
pub(crate) const PHONE_MAX_LEN: usize = 10;
pub(crate) const PHONE_MIN_LEN: usize = 10;

// Character lighting --------------------------------------------------------
pub(crate) const LIGHT_BASE_INTENSITY: f32 = 150.0;
pub(crate) const LIGHT_PULSE_AMPLITUDE: f32 = 50.0;
pub(crate) const LIGHT_SETTLED_INTENSITY: f32 = 100.0;
pub(crate) const LIGHT_SETTLE_RATE: f32 = 0.05;
pub(crate) const LIGHT_HUE_REV_PER_SEC: f32 = 0.5;
pub(crate) const COMMON_PULSE_SPEED: f32 = 3.0;
pub(crate) const RARE_PULSE_SPEED: f32 = 5.0;
pub(crate) const SUPER_RARE_PULSE_SPEED: f32 = 8.0;

// Presentation copy ---------------------------------------------------------
pub(crate) const PROMPT_START: &str = "TAP TO START!";
pub(crate) const PROMPT_NEXT: &str = "TAP FOR NEXT ▶";
pub(crate) const ALERT_INVALID_PHONE: &str = "Please enter a valid phone number";
pub(crate) const ALERT_SUBMITTED: &str = "Redemption submitted!";
pub(crate) const ALERT_CONNECTION_FAILED: &str = "Could not connect to the server";
