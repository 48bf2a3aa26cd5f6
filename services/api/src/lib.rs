//! GoDash API Library Crate
//!
//! Configuration, Postgres persistence, HTTP handlers and routing for the
//! sales-training service. The `api` binary is a thin wrapper around this
//! library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
