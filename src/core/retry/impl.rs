use super::types::*;
use super::utils::*;
use std::collections::BTreeSet;
use std::time::Duration;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_policy: BackoffPolicy::default(),
            retryable_statuses: BTreeSet::from([408, 429]),
        }
    }
}

impl Classification {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Classification::Success)
    }
}

impl RetryPolicy {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff_policy: BackoffPolicy) -> Self {
        self.backoff_policy = backoff_policy;
        self
    }

    pub fn with_retryable_status(mut self, status: u16) -> Self {
        self.retryable_statuses.insert(status);
        self
    }

    pub fn without_retryable_statuses(mut self) -> Self {
        self.retryable_statuses.clear();
        self
    }

    pub fn classify(&self, status: u16) -> Classification {
        classify_status(status)
    }

    /// Whether a failure of this kind may be retried at all, regardless of
    /// how many attempts are left.
    pub fn is_retryable(&self, classification: Classification, status: Option<u16>) -> bool {
        match classification {
            Classification::Success => false,
            Classification::TransportError | Classification::ServerError => true,
            Classification::ClientError => status
                .map(|status| self.retryable_statuses.contains(&status))
                .unwrap_or(false),
        }
    }

    /// Decides what follows attempt number `attempts_made` (1-based). A request
    /// allowing `max_retries` retries gets at most `max_retries + 1` attempts.
    pub fn decide(
        &self,
        classification: Classification,
        status: Option<u16>,
        attempts_made: usize,
        max_retries: usize,
    ) -> RetryDecision {
        if !classification.is_failure() {
            return RetryDecision::Done;
        }
        if !self.is_retryable(classification, status) || attempts_made > max_retries {
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry {
            delay: self.calculate_delay(attempts_made),
        }
    }

    pub fn calculate_delay(&self, retry: usize) -> Duration {
        calculate_delay(self, retry)
    }
}
