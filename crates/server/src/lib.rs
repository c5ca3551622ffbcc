//! Little Threads catalog service library.
//!
//! The binary in `main.rs` wires configuration, stores and Sentry around
//! [`routes::app`]. Everything else lives here so the router can be driven
//! in tests over in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
