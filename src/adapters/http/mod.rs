//! HTTP adapter.
//!
//! Exposes both workflow variants to the browser as JSON endpoints with the
//! session carried in a cookie.

pub mod protocol;
pub mod routes;
pub mod server;

pub use routes::build_routes;
pub use server::GatewayState;
