//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`videos`] - Starting downloads and serving stored items
//! - [`system`] - Health and OpenAPI

mod system;
mod videos;

pub use system::*;
pub use videos::*;
