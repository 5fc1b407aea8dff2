//! HTTP API for funding overviews

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::{error_response, status_for, OverviewApiState};
pub use models::{parse_overview_request, ErrorBody, QueryParams};
pub use routes::create_router;
