pub mod auth;
pub mod middleware;
pub mod rest;
pub mod routes;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary that will start the web server.
pub use middleware::require_auth;
pub use routes::build_router;
pub use state::AppState;
