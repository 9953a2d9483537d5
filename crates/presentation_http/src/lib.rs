//! Speech gateway HTTP presentation layer
//!
//! This crate provides the HTTP API: `POST /synthesize`, `POST /recognize`
//! and `GET /health`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::{RequestId, ValidatedJson, ValidationError};
pub use routes::create_router;
pub use state::AppState;
