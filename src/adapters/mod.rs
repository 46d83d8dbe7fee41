//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - Session storage keyed by session id and workflow variant
//! - The HTTP surface served to the browser

pub mod http;
pub mod session_store;
