//! Core types for Little Threads.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod access;
pub mod email;
pub mod id;
pub mod image;
pub mod list;
pub mod price;

pub use access::AccessLevel;
pub use email::{Email, EmailError};
pub use id::*;
pub use image::{ImageExtension, UnsupportedExtension};
pub use list::ListInput;
pub use price::{Price, PriceError};
