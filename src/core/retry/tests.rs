use crate::core::retry::{
    calculate_delay, classify_status, BackoffPolicy, Classification, RetryDecision, RetryPolicy,
};
use std::time::Duration;

#[test]
fn test_classify_status() {
    assert_eq!(classify_status(200), Classification::Success);
    assert_eq!(classify_status(302), Classification::Success);
    assert_eq!(classify_status(399), Classification::Success);
    assert_eq!(classify_status(400), Classification::ClientError);
    assert_eq!(classify_status(404), Classification::ClientError);
    assert_eq!(classify_status(499), Classification::ClientError);
    assert_eq!(classify_status(500), Classification::ServerError);
    assert_eq!(classify_status(503), Classification::ServerError);
    assert_eq!(classify_status(599), Classification::ServerError);
}

#[test]
fn test_default_exponential_schedule() {
    let policy = RetryPolicy::default();

    let expected = [1, 2, 4, 8, 16, 30, 30, 30];
    for (index, seconds) in expected.iter().enumerate() {
        assert_eq!(
            policy.calculate_delay(index + 1),
            Duration::from_secs(*seconds),
            "retry {}",
            index + 1
        );
    }
}

#[test]
fn test_delay_never_exceeds_cap() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.calculate_delay(64), Duration::from_secs(30));
    assert_eq!(policy.calculate_delay(10_000), Duration::from_secs(30));
    assert_eq!(policy.calculate_delay(usize::MAX), Duration::from_secs(30));
}

#[test]
fn test_constant_and_linear_backoff() {
    let constant = RetryPolicy::default()
        .with_initial_delay(Duration::from_millis(100))
        .with_backoff(BackoffPolicy::Constant);
    assert_eq!(calculate_delay(&constant, 1), Duration::from_millis(100));
    assert_eq!(calculate_delay(&constant, 5), Duration::from_millis(100));

    let linear = RetryPolicy::default()
        .with_initial_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_backoff(BackoffPolicy::Linear);
    assert_eq!(linear.calculate_delay(1), Duration::from_secs(1));
    assert_eq!(linear.calculate_delay(2), Duration::from_secs(2));
    assert_eq!(linear.calculate_delay(3), Duration::from_secs(3));
    assert_eq!(linear.calculate_delay(9), Duration::from_secs(3));
}

#[test]
fn test_retry_allowed_while_attempts_within_max_retries() {
    let policy = RetryPolicy::default();

    for attempt in 1..=3 {
        assert_eq!(
            policy.decide(Classification::ServerError, Some(500), attempt, 3),
            RetryDecision::Retry {
                delay: policy.calculate_delay(attempt)
            }
        );
    }
    assert_eq!(
        policy.decide(Classification::ServerError, Some(500), 4, 3),
        RetryDecision::GiveUp
    );
}

#[test]
fn test_transport_errors_are_retried() {
    let policy = RetryPolicy::default();
    assert_eq!(
        policy.decide(Classification::TransportError, None, 1, 1),
        RetryDecision::Retry {
            delay: Duration::from_secs(1)
        }
    );
    assert_eq!(
        policy.decide(Classification::TransportError, None, 2, 1),
        RetryDecision::GiveUp
    );
}

#[test]
fn test_client_errors_give_up_immediately() {
    let policy = RetryPolicy::default();
    assert_eq!(
        policy.decide(Classification::ClientError, Some(404), 1, 3),
        RetryDecision::GiveUp
    );
    assert_eq!(
        policy.decide(Classification::ClientError, Some(401), 1, 3),
        RetryDecision::GiveUp
    );
}

#[test]
fn test_explicitly_retryable_client_statuses() {
    let policy = RetryPolicy::default();
    assert!(policy.is_retryable(Classification::ClientError, Some(429)));
    assert!(policy.is_retryable(Classification::ClientError, Some(408)));
    assert!(!policy.is_retryable(Classification::ClientError, Some(404)));

    let strict = RetryPolicy::default().without_retryable_statuses();
    assert!(!strict.is_retryable(Classification::ClientError, Some(429)));

    let custom = strict.with_retryable_status(409);
    assert!(matches!(
        custom.decide(Classification::ClientError, Some(409), 1, 2),
        RetryDecision::Retry { .. }
    ));
}

#[test]
fn test_success_needs_no_decision() {
    let policy = RetryPolicy::default();
    assert_eq!(
        policy.decide(Classification::Success, Some(200), 1, 3),
        RetryDecision::Done
    );
}

#[test]
fn test_zero_max_retries_gives_up_after_first_attempt() {
    let policy = RetryPolicy::default();
    assert_eq!(
        policy.decide(Classification::ServerError, Some(502), 1, 0),
        RetryDecision::GiveUp
    );
}
