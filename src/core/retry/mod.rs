mod r#impl;
mod types;
mod utils;

pub use types::{BackoffPolicy, Classification, RetryDecision, RetryPolicy};
pub use utils::{calculate_delay, classify_status};

#[cfg(test)]
mod tests;
