//! HTTP middleware components
//!
//! Request id propagation and validated JSON extraction.

pub mod request_id;
pub mod validation;

pub use request_id::{REQUEST_ID_HEADER, RequestId, propagate_request_id};
pub use validation::{ValidatedJson, ValidationError};
