//! Core infrastructure for docgraph.
//!
//! This crate turns a flat collection of independently constructed documentation nodes into
//! one connected, typed graph:
//! - Node model with arena ids and typed cross-references
//! - Symbol table keyed by qualified name
//! - Flat node store partitioned by kind
//! - One resolver per entity kind
//! - Graph assembly in a fixed resolver order
//! - Error types and error codes
//!
//! The crate performs no I/O. Extraction, node construction and persistence live in the
//! `docgraph` crate.

pub mod context;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod resolve;
pub mod store;
pub mod symbols;
