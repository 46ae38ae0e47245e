//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;
use std::time::Duration;

use crate::constants::CLIP_FPS;

/// Convert an authored clip frame number into clip-local seconds.
#[must_use]
pub fn frames_to_seconds(frame: u32) -> f32 {
    let frame = cast::<u32, f32>(frame).unwrap_or(0.0);
    let fps = cast::<u32, f32>(CLIP_FPS).unwrap_or(1.0);
    frame / fps
}

/// Fraction of `count` over `total`, returning 0.0 for an empty total.
#[must_use]
pub fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let count = cast::<usize, f64>(count).unwrap_or(0.0);
    let total = cast::<usize, f64>(total).unwrap_or(f64::MAX);
    count / total
}

/// Convert a duration to seconds as f32, the unit animation clocks run in.
#[must_use]
pub fn duration_to_secs_f32(duration: Duration) -> f32 {
    clamp_f64_to_f32(duration.as_secs_f64())
}

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_convert_at_clip_rate() {
        assert!((frames_to_seconds(0) - 0.0).abs() < f32::EPSILON);
        assert!((frames_to_seconds(30) - 1.0).abs() < f32::EPSILON);
        assert!((frames_to_seconds(420) - 14.0).abs() < 1e-5);
    }

    #[test]
    fn ratio_handles_empty_total() {
        assert!((ratio(3, 0) - 0.0).abs() < f64::EPSILON);
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_f64_to_f32(f64::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(f64::from(f32::MAX) * 2.0) - f32::MAX).abs() < f32::EPSILON);
    }

    #[test]
    fn durations_become_seconds() {
        let secs = duration_to_secs_f32(Duration::from_millis(1_500));
        assert!((secs - 1.5).abs() < 1e-6);
    }
}
