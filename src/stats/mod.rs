use crate::core::retry::Classification;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub requests_attempted: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub total_retries: usize,
    pub bytes_downloaded: usize,
    pub status_codes: HashMap<u16, usize>,
    pub retry_reasons: BTreeMap<Classification, usize>,
    pub average_response_time_ms: f64,
}

impl RunStatistics {
    /// Requests whose final outcome is not known yet.
    pub fn unresolved(&self) -> usize {
        self.requests_attempted
            .saturating_sub(self.requests_succeeded + self.requests_failed)
    }
}

/// Shared counters of a fetch session. Every mutation happens under the
/// write lock; readers get a cloned snapshot.
#[derive(Debug)]
pub struct StatsTracker {
    stats: RwLock<RunStatistics>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(RunStatistics {
                start_time: Utc::now(),
                end_time: None,
                requests_attempted: 0,
                requests_succeeded: 0,
                requests_failed: 0,
                total_retries: 0,
                bytes_downloaded: 0,
                status_codes: HashMap::new(),
                retry_reasons: BTreeMap::new(),
                average_response_time_ms: 0.0,
            }),
        }
    }

    pub fn record_attempt(&self) {
        self.stats.write().requests_attempted += 1;
    }

    /// Records a response received from the transport, whatever its status.
    pub fn record_response(&self, status: u16, size: usize, elapsed: Duration) {
        let mut stats = self.stats.write();
        *stats.status_codes.entry(status).or_insert(0) += 1;
        stats.bytes_downloaded += size;

        // Running mean over every response seen so far.
        let responses: usize = stats.status_codes.values().sum();
        let current_total = stats.average_response_time_ms * (responses - 1) as f64;
        let new_duration = elapsed.as_secs_f64() * 1000.0;
        stats.average_response_time_ms = (current_total + new_duration) / responses as f64;
    }

    pub fn record_success(&self) {
        self.stats.write().requests_succeeded += 1;
    }

    pub fn record_failure(&self) {
        self.stats.write().requests_failed += 1;
    }

    pub fn record_retry(&self, reason: Classification) {
        let mut stats = self.stats.write();
        stats.total_retries += 1;
        *stats.retry_reasons.entry(reason).or_insert(0) += 1;
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> RunStatistics {
        self.stats.read().clone()
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.start_time);

        writeln!(f, "Fetch Statistics:")?;
        writeln!(f, "=================")?;
        writeln!(f, "Duration: {} seconds", duration.num_seconds())?;
        writeln!(f, "Requests Attempted: {}", self.requests_attempted)?;
        writeln!(f, "Requests Succeeded: {}", self.requests_succeeded)?;
        writeln!(f, "Requests Failed: {}", self.requests_failed)?;
        writeln!(f, "Total Retries: {}", self.total_retries)?;
        writeln!(
            f,
            "Data Downloaded: {:.2} MB",
            self.bytes_downloaded as f64 / 1_000_000.0
        )?;
        write!(
            f,
            "Average Response Time: {:.2}ms",
            self.average_response_time_ms
        )?;

        if !self.status_codes.is_empty() {
            let mut codes: Vec<_> = self.status_codes.iter().collect();
            codes.sort();
            write!(f, "\nStatus Codes:")?;
            for (code, count) in codes {
                write!(f, "\n  {}: {}", code, count)?;
            }
        }

        if !self.retry_reasons.is_empty() {
            write!(f, "\nRetry Reasons:")?;
            for (reason, count) in &self.retry_reasons {
                write!(f, "\n  {:?}: {}", reason, count)?;
            }
        }
        Ok(())
    }
}
