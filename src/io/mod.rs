//! I/O layer: fetching tiles and pages over HTTP.

mod http;
mod transport;

pub use http::{create_http_client, HttpTransport, DEFAULT_TIMEOUT_SECS, USER_AGENT};
pub use transport::TileTransport;
