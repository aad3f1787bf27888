mod config;
mod errors;
mod fetching;
pub mod limiter;
pub mod retry;

pub use config::FetcherConfig;
pub use errors::{FetchError, FetchResult, TransportError};
pub use fetching::{Fetcher, RequestState};
pub use limiter::{RateLimiter, SlotPermit};
