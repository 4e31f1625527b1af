mod error;
mod handlers;
mod license;
mod middleware;
mod routes;
mod update;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
