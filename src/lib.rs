//! Deal aggregation service: cached deal listings, dynamic search filters
//! and crawler ingestion.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
