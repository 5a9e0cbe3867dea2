//! Response envelopes and request extractors

pub mod error;
pub mod json;
pub mod response;

pub use error::{ApiError, ApiErrorResponse, FailureReason};
pub use json::Json;
pub use response::{ApiResponse, ResponseStatus};
