pub mod error;
pub mod handlers;
pub mod middleware;
pub mod products;
pub mod routes;
pub mod sessions;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
pub use sessions::SESSION_HEADER;
