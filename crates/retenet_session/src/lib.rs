//! Rule sessions for Retenet.
//!
//! This crate provides:
//! - [`RuleSession`] - a named session owning a type registry, a rule set,
//!   and working memory behind one lock, with agenda firing and delayed
//!   asserts
//! - [`SessionConfig`] - startup configuration
//! - [`Tracer`] / [`TraceEvent`] - a bounded trace buffer recording session
//!   activity for tests and debugging
//!
//! Sessions are looked up by name in a process-wide registry, so embedding
//! code in different modules can share one session without plumbing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod session;
mod trace;

pub use session::{RuleSession, SessionConfig};
pub use trace::{TraceEvent, TraceRecord, Tracer};
