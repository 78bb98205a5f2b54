//! service-core: Shared infrastructure for the invoice service.
pub mod config;
pub mod error;
pub mod observability;

pub use tracing;
