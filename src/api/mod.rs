//! HTTP front door

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::{error_response, AppState};
pub use models::{ApiError, QueryRequest, QueryResponse};
pub use routes::build_router;
