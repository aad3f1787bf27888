pub mod core;
pub mod http;
pub mod logging;
pub mod stats;
pub mod transports;

pub use crate::core::retry::{BackoffPolicy, Classification, RetryPolicy};
pub use crate::core::{FetchError, FetchResult, Fetcher, FetcherConfig, RateLimiter, TransportError};
pub use http::{RequestSpec, ResponseBody, ResponseRecord};
pub use stats::{RunStatistics, StatsTracker};
pub use transports::{HttpTransport, MockTransport, Transport};
