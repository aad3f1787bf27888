use crate::core::limiter::RateLimiter;
use crate::core::retry::{Classification, RetryDecision, RetryPolicy};
use crate::core::{FetchError, FetchResult, FetcherConfig, TransportError};
use crate::http::{RequestSpec, ResponseBody, ResponseRecord};
use crate::stats::{RunStatistics, StatsTracker};
use crate::transports::{HttpTransport, Transport};
use chrono::Utc;
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinError};
use tokio::time::{sleep, timeout, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Attempting,
    RetryWait,
    Success,
    Failed,
}

impl RequestState {
    fn advance(self, next: RequestState, spec: &RequestSpec) -> RequestState {
        debug!(
            "{} {}: {:?} -> {:?}",
            spec.method(),
            spec.url(),
            self,
            next
        );
        next
    }
}

/// State shared by every request task of a session.
struct FetchEngine {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    retry_policy: RetryPolicy,
    stats: StatsTracker,
    live_tasks: Arc<AtomicUsize>,
}

/// Counts a spawned request task until its future is dropped, whether it
/// finished or was aborted.
struct LiveTask(Arc<AtomicUsize>);

impl LiveTask {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FetchEngine {
    async fn fetch_one(&self, spec: &RequestSpec) -> FetchResult<ResponseRecord> {
        let url = spec.url();
        let mut state = RequestState::Pending;
        let mut attempt = 0;

        loop {
            attempt += 1;
            state = state.advance(RequestState::Attempting, spec);

            let slot = match self.limiter.acquire().await {
                Ok(slot) => slot,
                Err(e) => {
                    self.stats.record_failure();
                    state.advance(RequestState::Failed, spec);
                    return Err(e);
                }
            };
            self.stats.record_attempt();
            debug!(
                "Attempt {} for {} {} ({} in flight)",
                attempt,
                spec.method(),
                url,
                self.limiter.in_flight()
            );

            let started_at = Utc::now();
            let start = Instant::now();
            let outcome = match timeout(spec.timeout(), self.transport.send(spec)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout),
            };
            let elapsed = start.elapsed();
            // The backoff below must not pin a slot.
            self.limiter.release(slot);

            let failure = match outcome {
                Ok(raw) => {
                    self.stats
                        .record_response(raw.status, raw.body.len(), elapsed);

                    match self.retry_policy.classify(raw.status) {
                        Classification::Success => {
                            let body = ResponseBody::decode(raw.content_type(), &raw.body);
                            let record = ResponseRecord::new(
                                url.clone(),
                                raw.status,
                                raw.headers,
                                body,
                                elapsed,
                                attempt,
                                started_at,
                            );
                            self.stats.record_success();
                            state.advance(RequestState::Success, spec);
                            info!(
                                "Success {} - {} ({:.2}s, attempt {})",
                                url,
                                raw.status,
                                elapsed.as_secs_f64(),
                                attempt
                            );
                            return Ok(record);
                        }
                        Classification::ClientError => FetchError::Client {
                            url: url.clone(),
                            status: raw.status,
                        },
                        Classification::ServerError | Classification::TransportError => {
                            FetchError::Server {
                                url: url.clone(),
                                status: raw.status,
                            }
                        }
                    }
                }
                Err(source) => FetchError::Transport {
                    url: url.clone(),
                    source,
                },
            };

            let classification = failure
                .classification()
                .unwrap_or(Classification::TransportError);
            let status = failure.status();

            match self
                .retry_policy
                .decide(classification, status, attempt, spec.max_retries())
            {
                RetryDecision::Retry { delay } => {
                    self.stats.record_retry(classification);
                    state = state.advance(RequestState::RetryWait, spec);
                    warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt, url, failure, delay
                    );
                    sleep(delay).await;
                }
                RetryDecision::GiveUp | RetryDecision::Done => {
                    self.stats.record_failure();
                    state.advance(RequestState::Failed, spec);

                    if !self.retry_policy.is_retryable(classification, status) {
                        error!("Failed {} {}: {}", spec.method(), url, failure);
                        return Err(failure);
                    }

                    error!(
                        "Failed {} after {} attempts: {}",
                        url, attempt, failure
                    );
                    return Err(FetchError::ExhaustedRetries {
                        url: url.clone(),
                        attempts: attempt,
                        last: Box::new(failure),
                    });
                }
            }
        }
    }
}

type IndexedJoin<T> = BoxFuture<'static, (usize, Result<T, JoinError>)>;

/// Spawned tasks of one batch. Dropping the group aborts whatever is still
/// running; [`TaskGroup::shutdown`] also waits for the aborted tasks.
struct TaskGroup<T> {
    running: FuturesUnordered<IndexedJoin<T>>,
    aborts: Vec<AbortHandle>,
}

impl<T: Send + 'static> TaskGroup<T> {
    fn new() -> Self {
        Self {
            running: FuturesUnordered::new(),
            aborts: Vec::new(),
        }
    }

    fn spawn<F>(&mut self, index: usize, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.aborts.push(handle.abort_handle());
        self.running
            .push(handle.map(move |joined| (index, joined)).boxed());
    }

    async fn next(&mut self) -> Option<(usize, Result<T, JoinError>)> {
        self.running.next().await
    }

    async fn shutdown(&mut self) {
        for abort in &self.aborts {
            abort.abort();
        }
        while self.running.next().await.is_some() {}
    }
}

impl<T> Drop for TaskGroup<T> {
    fn drop(&mut self) {
        for abort in &self.aborts {
            abort.abort();
        }
    }
}

/// A fetch session: owns the transport, the concurrency limiter and the run
/// statistics. The transport is closed exactly once, by [`Fetcher::close`] or
/// when the fetcher is dropped.
pub struct Fetcher {
    engine: Arc<FetchEngine>,
    closed: AtomicBool,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> FetchResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: FetcherConfig, transport: Arc<dyn Transport>) -> Self {
        let limiter = RateLimiter::new(config.max_concurrent);
        info!(
            "Opening fetch session (max_concurrent={}, pool_size={})",
            limiter.max_concurrent(),
            config.pool_size
        );

        Self {
            engine: Arc::new(FetchEngine {
                transport,
                limiter,
                retry_policy: config.retry_policy,
                stats: StatsTracker::new(),
                live_tasks: Arc::new(AtomicUsize::new(0)),
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn fetch_one(&self, spec: RequestSpec) -> FetchResult<ResponseRecord> {
        self.engine.fetch_one(&spec).await
    }

    /// Fetches every spec concurrently and returns the successful records in
    /// submission order. Failures are counted and logged, never propagated.
    pub async fn fetch_all(&self, specs: Vec<RequestSpec>) -> FetchResult<Vec<ResponseRecord>> {
        self.fetch_all_until(specs, future::pending::<()>()).await
    }

    /// Like [`Fetcher::fetch_all`], but gives up with [`FetchError::Cancelled`]
    /// as soon as `cancel` completes. Every outstanding task has been aborted
    /// and joined by the time this returns.
    pub async fn fetch_all_until<C>(
        &self,
        specs: Vec<RequestSpec>,
        cancel: C,
    ) -> FetchResult<Vec<ResponseRecord>>
    where
        C: Future<Output = ()>,
    {
        info!(
            "Fetching {} requests (max_concurrent={})",
            specs.len(),
            self.engine.limiter.max_concurrent()
        );

        let labels: Vec<String> = specs
            .iter()
            .map(|spec| format!("{} {}", spec.method(), spec.url()))
            .collect();
        let mut outcomes: Vec<Option<FetchResult<ResponseRecord>>> =
            labels.iter().map(|_| None).collect();

        let mut tasks = TaskGroup::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let live = LiveTask::register(&engine.live_tasks);
            tasks.spawn(index, async move {
                let _live = live;
                engine.fetch_one(&spec).await
            });
        }

        let mut cancel = std::pin::pin!(cancel);
        loop {
            tokio::select! {
                biased;

                _ = cancel.as_mut() => {
                    warn!("Batch cancelled, aborting outstanding requests");
                    tasks.shutdown().await;
                    return Err(FetchError::Cancelled);
                }
                joined = tasks.next() => match joined {
                    Some((index, Ok(outcome))) => outcomes[index] = Some(outcome),
                    Some((index, Err(join_error))) => {
                        error!("Task for {} failed: {}", labels[index], join_error);
                        tasks.shutdown().await;
                        return Err(FetchError::Task(join_error));
                    }
                    None => break,
                },
            }
        }

        let mut succeeded = Vec::with_capacity(outcomes.len());
        let mut failed = 0;
        for (label, outcome) in labels.iter().zip(outcomes) {
            match outcome {
                Some(Ok(record)) => succeeded.push(record),
                Some(Err(e)) => {
                    warn!("Request {} failed: {}", label, e);
                    failed += 1;
                }
                None => {}
            }
        }

        if failed > 0 {
            warn!("Failed to fetch {} URLs", failed);
        }
        Ok(succeeded)
    }

    pub fn get_stats(&self) -> RunStatistics {
        self.engine.stats.get_stats()
    }

    /// Request tasks spawned by batches that are still alive.
    pub fn active_tasks(&self) -> usize {
        self.engine.live_tasks.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.engine.limiter.max_concurrent()
    }

    pub fn close(self) {
        self.shutdown();
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.engine.limiter.close();
        self.engine.transport.close();
        self.engine.stats.finish();
        info!("Fetch session closed\n{}", self.engine.stats.get_stats());
    }
}

impl Drop for Fetcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
