//! Backstage API service library crate.
//!
//! # Purpose
//! Exposes the HTTP surface over `backstage-authz`, plus configuration and
//! observability wiring, for use by the binary and tests.
pub mod api;
pub mod app;
pub mod config;
pub mod observability;
