use super::types::*;
use std::time::Duration;

pub fn classify_status(status: u16) -> Classification {
    match status {
        0..=399 => Classification::Success,
        400..=499 => Classification::ClientError,
        _ => Classification::ServerError,
    }
}

/// Delay before retry number `retry` (1-based), capped at `max_delay`.
pub fn calculate_delay(policy: &RetryPolicy, retry: usize) -> Duration {
    let step = retry.saturating_sub(1);
    let initial = policy.initial_delay.as_secs_f64();

    let seconds = match policy.backoff_policy {
        BackoffPolicy::Constant => initial,
        BackoffPolicy::Linear => initial * retry.max(1) as f64,
        BackoffPolicy::Exponential { factor } => {
            let exponent = i32::try_from(step).unwrap_or(i32::MAX);
            initial * f64::from(factor).powi(exponent)
        }
    };

    // Overflowing or non-finite products saturate to the cap.
    Duration::try_from_secs_f64(seconds)
        .map(|delay| std::cmp::min(delay, policy.max_delay))
        .unwrap_or(policy.max_delay)
}
