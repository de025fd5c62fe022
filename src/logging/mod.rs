//! Structured logging.

mod format;

pub use format::{ScoreLine, StructuredLogger};
