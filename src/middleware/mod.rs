//! Request pipeline stages.
//!
//! Each stage is a plain async fn or tower layer; [`pipeline`] fixes their order and
//! wraps the route layer in them.

pub mod access_log;
pub mod cors;
pub mod pipeline;
pub mod rate_limit;
pub mod request_id;
