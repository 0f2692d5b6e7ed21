//! REST API for Drivebox.
//!
//! Routes live under `/api`; the OpenAPI document is served by Swagger UI
//! at `/swagger-ui`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
