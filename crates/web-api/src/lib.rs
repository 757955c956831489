pub mod error;
pub mod handlers;
pub mod health;
pub mod server;

pub use error::ApiError;
pub use handlers::{AppState, CallerId, CALLER_HEADER};
pub use health::{DatabaseHealth, HealthResponse};
pub use server::{spawn_cache_sweeper, ApiServer};
