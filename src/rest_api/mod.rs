//! # REST API Module
//!
//! HTTP listing endpoint for tenant objects: filter document in, paged
//! envelope out.

pub mod errors;
pub mod handler;
pub mod server;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use handler::{ObjectsHandler, QUERY_PARAM};
pub use server::ApiServer;
