//! Popularity score normalization.
//!
//! Every provider maps its raw metric onto a common, roughly 0–100 scale
//! with `log10(metric + 1) / divisor * 100`. The divisor is a calibration
//! constant per metric: it is the `log10` of the "very popular" reference
//! value that should land near 100. Negative metrics are clamped to 0
//! first, so the result is never negative.

/// Upvotes: ~1,000,000 maps to ~100.
pub const UPVOTE_DIVISOR: f64 = 6.0;

/// View counts: ~1,000,000,000 maps to ~100.
pub const VIEW_COUNT_DIVISOR: f64 = 9.0;

/// Log-scale normalization with negative-input clamping.
///
/// Monotonically non-decreasing in `metric`, and `0.0` at `metric <= 0`.
pub fn log_scale(metric: f64, divisor: f64) -> f64 {
    let metric = if metric.is_nan() { 0.0 } else { metric.max(0.0) };
    (metric + 1.0).log10() / divisor * 100.0
}

/// Reddit upvotes → score.
pub fn reddit_score(ups: i64) -> f64 {
    log_scale(ups as f64, UPVOTE_DIVISOR)
}

/// YouTube view count → score.
pub fn youtube_score(views: i64) -> f64 {
    log_scale(views as f64, VIEW_COUNT_DIVISOR)
}

/// Clamp an advisory request limit into `1..=max`.
///
/// Out-of-range requests (zero or above the platform maximum) fall back to
/// the platform maximum rather than failing.
pub fn clamp_limit(limit: usize, max: usize) -> usize {
    if limit == 0 || limit > max {
        max
    } else {
        limit
    }
}
