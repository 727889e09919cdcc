//! HTTP layer
//!
//! The request and response types every stage works on, plus the small
//! protocol helpers the static file stage needs.

pub mod cache;
pub mod mime;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::{FinishHook, Response};
