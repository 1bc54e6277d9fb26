//! Tuple descriptors, tuples, and rule definitions for Retenet.
//!
//! This crate provides:
//! - [`TupleDescriptor`] / [`TypeRegistry`] - typed record schemas, parsed
//!   from a JSON descriptor document
//! - [`Tuple`] / [`TupleKey`] - schema-validated record instances with a
//!   stable identity
//! - [`Rule`] / [`Condition`] - rule definitions and the condition/action
//!   callback contracts the network invokes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod descriptor;
mod rule;
mod tuple;

pub use descriptor::{PropertyDescriptor, TupleDescriptor, TypeRegistry};
pub use rule::{ActionFn, Condition, ConditionFn, Rule, SessionContext, TupleMap};
pub use tuple::{Tuple, TupleKey};
