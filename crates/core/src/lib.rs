//! Little Threads Core - Shared domain types.
//!
//! This crate provides the types shared by every Little Threads component:
//! - `server` - The catalog and account HTTP service
//! - `cli` - Command-line tools for migrations and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and parsing rules - no I/O, no database
//! access, no HTTP clients. Validation that does not need a store lives here so
//! the HTTP layer and the CLI agree on it.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, prices, access levels, image extensions
//!   and list-valued form input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
