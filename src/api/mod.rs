// Plutus — HTTP API Module
//
// axum surface over the custody components and the wallet node. `/health`
// is public; every other route needs a bearer credential.

mod error;
mod handlers;
mod middleware;
mod server;
mod types;

pub use error::ApiError;
pub use server::{router, serve, AppState, RouteThrottles, THROTTLED_ROUTES};
