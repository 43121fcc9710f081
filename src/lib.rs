//! docgraph: resolves flat documentation-comment records into a rooted graph.
//!
//! Documentation comments are extracted into tag records, turned into typed nodes, resolved
//! into a graph of namespaces, interfaces, classes and members, and persisted to SQLite with
//! link markup rewritten.

// Resolution core - re-exported from docgraph-core
pub use docgraph_core::context;
pub use docgraph_core::error;
pub use docgraph_core::graph;
pub use docgraph_core::nodes;
pub use docgraph_core::resolve;
pub use docgraph_core::store;
pub use docgraph_core::symbols;

// Front end
pub mod jsdoc;
pub mod sources;

// Back end
pub mod persist;

// Front door
pub mod cli;
pub mod output;

// Error bridges - converts front-end and storage errors to DocError
mod error_bridges;
