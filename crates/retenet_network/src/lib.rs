//! The incremental RETE matching network for Retenet.
//!
//! This crate provides:
//! - [`IdGen`] - monotonic network-scoped id generation
//! - [`HandleService`] / [`ReteHandle`] - the tuple handle lifecycle
//! - [`JtService`] / [`JoinTable`] - per-join-point row storage
//! - [`JtRefs`] - the handle-to-row reverse index driving retraction
//! - [`Network`] - class nodes, compiled rule networks, and assert/retract
//!   propagation producing [`Activation`]s
//!
//! The network is single-threaded; the session layer serializes access.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod handle;
mod ids;
mod jointable;
mod jtrefs;
mod network;
mod node;

pub use handle::{HandleService, HandleStatus, ReteHandle};
pub use ids::{HandleId, IdGen, RowId};
pub use jointable::{JoinTable, JoinTableRow, JtService};
pub use jtrefs::JtRefs;
pub use network::{Activation, Network};
pub use node::RuleNetwork;
