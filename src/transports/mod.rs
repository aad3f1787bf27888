pub mod http_transport;
pub mod mock_transport;

mod transport;
pub use http_transport::HttpTransport;
pub use mock_transport::{MockResponse, MockTransport};
pub use transport::{RawResponse, Transport};
