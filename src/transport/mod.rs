//! HTTP plumbing for the remote generative API.

pub mod http;

pub use http::{HttpTransport, TransportError};
