//! Command implementations.

pub mod admin;
pub mod migrate;
