pub(crate) mod request;
pub(crate) mod response;

pub use request::{RequestSpec, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
pub use response::{ResponseBody, ResponseRecord};
