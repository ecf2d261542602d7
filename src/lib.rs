//! tenantdb - a multi-tenant object store
//!
//! Tenants define classes whose field schema is data. Clients filter
//! objects with a small JSON lookup DSL and page through them with id or
//! keyset cursors.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod executor;
pub mod fields;
pub mod filter;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod rest_api;
