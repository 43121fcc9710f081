//! Documentation comment front end.
//!
//! - [`tags`]: finds `/** ... */` blocks and splits them into ordered tag records
//! - [`handlers`]: turns one tag record into a typed [`Node`](docgraph_core::nodes::Node)

pub mod handlers;
pub mod tags;

pub use handlers::{handler_for, populate, NodeHandler};
pub use tags::{
    extract_records, parse_typed, split_type, ExtractError, RawTag, TagRecord, TypedText,
};
