//! JSON output types for the CLI.
//!
//! Every invocation prints exactly one JSON document on stdout: a [`BuildResponse`] on
//! success or an [`ErrorResponse`] on failure. `status` is always the first field and
//! `schema_version` the second.

use std::io::{self, Write};

use serde::Serialize;

use docgraph_core::error::{DocError, OutputErrorCode};
use docgraph_core::graph::{Graph, KindPass, NodeCounts};
use docgraph_core::resolve::DroppedNode;

use crate::persist::PersistSummary;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit status.
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &DocError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            DocError::InvalidArguments { details, .. } => details.clone(),
            DocError::Resolution(resolution) => Some(serde_json::json!({
                "name": resolution.name,
                "member_of": resolution.member_of,
            })),
            DocError::DuplicateQualifiedName {
                qualified_name,
                existing,
                incoming,
            } => Some(serde_json::json!({
                "qualified_name": qualified_name,
                "existing": existing,
                "incoming": incoming,
            })),
            DocError::ExtractionError { file, .. } => Some(serde_json::json!({ "file": file })),
            DocError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Response for any failed invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(error: ErrorInfo) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error,
        }
    }

    pub fn from_error(err: &DocError) -> Self {
        Self::new(ErrorInfo::from_error(err))
    }
}

// ============================================================================
// Build Response
// ============================================================================

/// Response for a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Source files read, in path order.
    pub files: Vec<String>,
    pub nodes: NodeCounts,
    /// Root namespace names.
    pub roots: Vec<String>,
    pub passes: Vec<KindPass>,
    /// Nodes left out of the graph.
    pub dropped: Vec<DroppedNode>,
    pub unresolved_references: usize,
    /// Absent when persistence was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<PersistSummary>,
    /// Present only with `--emit-graph`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<Graph>,
}

impl BuildResponse {
    pub fn new(files: Vec<String>, graph: &Graph, passes: Vec<KindPass>) -> Self {
        let dropped = passes
            .iter()
            .flat_map(|pass| pass.stats.dropped.iter().cloned())
            .collect();
        let unresolved_references = passes
            .iter()
            .map(|pass| pass.stats.unresolved_references)
            .sum();
        BuildResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            files,
            nodes: graph.counts(),
            roots: graph.roots().keys().cloned().collect(),
            passes,
            dropped,
            unresolved_references,
            persisted: None,
            graph: None,
        }
    }

    pub fn with_persisted(mut self, summary: PersistSummary) -> Self {
        self.persisted = Some(summary);
        self
    }

    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = Some(graph);
        self
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::context::ResolutionContext;
    use docgraph_core::error::ResolutionError;
    use docgraph_core::graph::GraphAssembler;
    use docgraph_core::nodes::Node;

    fn small_build() -> BuildResponse {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        ctx.add(Node::class("App").with_member_of("plat")).unwrap();
        ctx.add(Node::property("lost").with_member_of("plat.Nope"))
            .unwrap();
        let (graph, report) = GraphAssembler::new().build(ctx).unwrap();
        BuildResponse::new(vec!["a.js".to_string()], &graph, report.passes)
    }

    mod build_response {
        use super::*;

        #[test]
        fn status_and_schema_come_first() {
            let mut buf = Vec::new();
            emit_response(&small_build(), &mut buf).unwrap();
            let text = String::from_utf8(buf).unwrap();
            let status = text.find("\"status\"").unwrap();
            let schema = text.find("\"schema_version\"").unwrap();
            let files = text.find("\"files\"").unwrap();
            assert!(status < schema && schema < files);
            assert!(text.ends_with('\n'));
        }

        #[test]
        fn optional_sections_are_absent() {
            let json = serde_json::to_value(small_build()).unwrap();
            assert_eq!(json["status"], "ok");
            assert!(json.get("persisted").is_none());
            assert!(json.get("graph").is_none());
        }

        #[test]
        fn dropped_nodes_are_collected_from_passes() {
            let response = small_build();
            assert_eq!(response.roots, ["plat"]);
            assert_eq!(response.nodes.classes, 1);
            assert_eq!(response.dropped.len(), 1);
            assert_eq!(response.dropped[0].name, "lost");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn resolution_error_uses_code_3() {
            let err = DocError::from(ResolutionError::new("web", Some("plat.missing")));
            let response = ErrorResponse::from_error(&err);
            assert_eq!(response.status, "error");
            assert_eq!(response.error.code, 3);
            let details = response.error.details.unwrap();
            assert_eq!(details["member_of"], "plat.missing");
        }

        #[test]
        fn internal_error_has_no_details() {
            let response = ErrorResponse::from_error(&DocError::internal("boom"));
            assert_eq!(response.error.code, 10);
            let json = serde_json::to_value(&response).unwrap();
            assert!(json["error"].get("details").is_none());
        }
    }
}
