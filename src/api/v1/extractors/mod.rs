/*
 * Responsibility
 * - Handler-facing extractors whose rejections are AppError (JSON envelope)
 */
pub mod payload;
pub mod request_ctx;

pub use payload::{ApiJson, ApiQuery};
