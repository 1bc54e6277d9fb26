//! Retenet - Embeddable forward-chaining rule engine
//!
//! This crate re-exports all layers of the Retenet system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: retenet_session    — Named sessions, agenda firing, scheduling
//! Layer 2: retenet_network    — RETE node network, join tables, handles
//! Layer 1: retenet_model      — Tuple descriptors, tuples, rule definitions
//! Layer 0: retenet_foundation — Core types (Value, Type, Error)
//! ```

pub use retenet_foundation as foundation;
pub use retenet_model as model;
pub use retenet_network as network;
pub use retenet_session as session;
