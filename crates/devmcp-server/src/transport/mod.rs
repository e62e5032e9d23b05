//! Network-facing endpoints binding sessions to HTTP.

mod sse;

pub use sse::{TransportState, router};
