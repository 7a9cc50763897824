//! Score evolution over time.
//!
//! A memory's effective score decays exponentially from its salience with
//! elapsed time since the last access, slowed by how often it has been
//! recalled. Short-term memories decay per hour; long-term and episodic
//! memories decay per day on the same curve (~24× slower).

use super::types::MemoryType;

/// Base decay applied per time unit (hour for short-term, day otherwise).
pub const DEFAULT_DECAY_RATE: f64 = 0.995;

/// Salience floor for long-term promotion.
pub const DEFAULT_PROMOTION_THRESHOLD: f64 = 0.6;

/// Scale for the access-count slowdown; saturates at +30 %.
const ACCESS_SLOWDOWN_K: f64 = 0.05;
const ACCESS_SLOWDOWN_CAP: f64 = 0.3;

/// Compute the current effective score.
///
/// `decayed = salience * rate^units * slowdown`, where `units` is hours for
/// short-term and days otherwise, and `slowdown = 1 + min(0.3,
/// log2(1 + access_count) * 0.05)`. Clamped so the result never exceeds the
/// salience it decays from.
pub fn decayed_score(
    salience: f64,
    memory_type: MemoryType,
    hours_since_access: f64,
    access_count: u32,
    decay_rate: f64,
) -> f64 {
    let units = match memory_type {
        MemoryType::ShortTerm => hours_since_access,
        MemoryType::LongTerm | MemoryType::Episodic => hours_since_access / 24.0,
    };
    let units = units.max(0.0);

    let raw = salience * decay_rate.powf(units) * access_slowdown(access_count);
    raw.clamp(0.0, salience.clamp(0.0, 1.0))
}

/// Decay attenuation from repeated access, in `[1.0, 1.3]`.
pub fn access_slowdown(access_count: u32) -> f64 {
    let boost = ((1.0 + access_count as f64).log2() * ACCESS_SLOWDOWN_K).min(ACCESS_SLOWDOWN_CAP);
    1.0 + boost
}

/// Whether a short-term memory qualifies for long-term promotion.
///
/// Either it is salient enough and has been recalled at least once, or it has
/// outlived the retention window while its decayed score stayed above the
/// promotion threshold.
pub fn promotion_eligible(
    salience: f64,
    decayed: f64,
    access_count: u32,
    age_hours: f64,
    promotion_threshold: f64,
    retention_hours: f64,
) -> bool {
    (salience >= promotion_threshold && access_count >= 1)
        || (age_hours >= retention_hours && decayed >= promotion_threshold)
}

/// Diminishing salience boost applied on each access: `0.05 / (1 + n)`.
pub fn access_boost(access_count: u32) -> f64 {
    0.05 / (1.0 + access_count as f64)
}
