//! Core types, values, and errors for Retenet.
//!
//! This crate provides:
//! - [`Value`] - The field value type for all tuple data
//! - [`Type`] - Declared field types for schema validation
//! - [`Error`] - Rich error types with context
//!
//! Higher layers (model, network, session) build on these definitions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod value;

pub use error::{Error, ErrorKind, Result};
pub use value::{Type, Value};
