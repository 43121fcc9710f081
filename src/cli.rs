//! The build pipeline behind the `docgraph` binary.
//!
//! `run_build` runs the stages in sequence: collect sources, extract tag records, construct
//! nodes, resolve the graph, persist it (unless disabled) and assemble the response.

use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use docgraph_core::context::ResolutionContext;
use docgraph_core::error::DocError;
use docgraph_core::graph::GraphAssembler;

use crate::error_bridges::extraction_error;
use crate::jsdoc::{extract_records, populate};
use crate::output::BuildResponse;
use crate::persist::{self, GraphPersister, VersionInfo};
use crate::sources::collect_sources;

/// Version label stored when none is given.
pub const DEFAULT_VERSION: &str = "unversioned";

/// Database file used when `--db` is not given.
pub const DEFAULT_DB: &str = "docgraph.db";

/// Options for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Source file or directory.
    pub source: PathBuf,
    /// Base URI for rewritten `{@link}` markup.
    pub link_base: Option<String>,
    pub version: Option<String>,
    pub db_path: PathBuf,
    /// Include globs for directory sources. Empty means the defaults.
    pub include: Vec<String>,
    pub persist: bool,
    pub emit_graph: bool,
}

impl BuildOptions {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        BuildOptions {
            source: source.into(),
            link_base: None,
            version: None,
            db_path: PathBuf::from(DEFAULT_DB),
            include: Vec::new(),
            persist: true,
            emit_graph: false,
        }
    }

    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = Some(base.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_emit_graph(mut self, emit_graph: bool) -> Self {
        self.emit_graph = emit_graph;
        self
    }

    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }
}

/// Run the full pipeline against the database at `options.db_path`.
pub fn run_build(options: &BuildOptions) -> Result<BuildResponse, DocError> {
    let conn = if options.persist {
        Some(persist::open(Path::new(&options.db_path))?)
    } else {
        None
    };
    build_into(options, conn)
}

/// Run the pipeline against an already open connection (or none).
pub fn build_into(
    options: &BuildOptions,
    mut conn: Option<rusqlite::Connection>,
) -> Result<BuildResponse, DocError> {
    let _span = info_span!("build", source = %options.source.display()).entered();

    let sources = collect_sources(&options.source, &options.include)?;
    if sources.is_empty() {
        return Err(DocError::invalid_args(format!(
            "no source files matched under {}",
            options.source.display()
        )));
    }

    let mut ctx = ResolutionContext::new();
    let mut records_seen = 0;
    for file in &sources.files {
        let records =
            extract_records(&file.text).map_err(|e| extraction_error(&file.relative, e))?;
        records_seen += records.len();
        let added = populate(&mut ctx, &records)?;
        debug!(file = %file.relative, records = records.len(), nodes = added, "extracted");
    }
    info!(
        files = sources.len(),
        records = records_seen,
        nodes = ctx.len(),
        "construction complete"
    );

    let (mut graph, report) = GraphAssembler::new().build(ctx)?;

    let files = sources.files.iter().map(|f| f.relative.clone()).collect();
    let mut response = BuildResponse::new(files, &graph, report.passes);

    if let Some(conn) = conn.as_mut() {
        let persister = GraphPersister::new(VersionInfo {
            label: options.version_label().to_string(),
            source_hash: sources.combined_hash().0,
            link_base: options.link_base.clone(),
        })?;
        let summary = persister.persist(conn, &mut graph)?;
        response = response.with_persisted(summary);
    }

    if options.emit_graph {
        response = response.with_graph(graph);
    }
    Ok(response)
}
