//! Feature modules
//!
//! - `extraction`: extractor runner and provider
//! - `cache`: per-target result caches
//! - `models`: variability, build and code model providers

pub mod cache;
pub mod extraction;
pub mod models;
