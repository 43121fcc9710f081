//! SQLite persistence for resolved graphs.
//!
//! Persistence runs after resolution and never feeds back into it:
//! - [`schema`]: migrations keyed on `PRAGMA user_version`
//! - [`procedures`]: per-kind create/read/update and link-table writers
//! - [`links`]: `{@link ...}` rewriting applied to stored descriptions
//!
//! [`GraphPersister::persist`] writes one documentation version inside a single transaction.
//! The graph's `id`/`saved` fields are only updated after the transaction commits.

pub mod links;
pub mod procedures;
pub mod schema;

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use docgraph_core::graph::Graph;
use docgraph_core::nodes::{InterfaceRef, Node, NodeData, NodeId, NodeKind, TypeLink};

pub use links::LinkRewriter;
pub use procedures::{EntityRow, EntityTable};

use procedures::{
    insert_interface_link, insert_parameter, insert_type_parameter, insert_version,
    set_class_links, set_event_type, set_method_return, set_property_type, InterfaceLinkRow,
    ParameterRow, TypeColumns, TypeParameterRow, VersionRow,
};

// ============================================================================
// Errors
// ============================================================================

/// Errors from the backing store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    /// A node's parent has no persisted id.
    #[error("parent of '{name}' was not persisted")]
    MissingParent { name: String },

    #[error("no row {id} in {table}")]
    NotFound { table: &'static str, id: i64 },

    #[error("invalid link pattern: {message}")]
    LinkPattern { message: String },
}

fn sqlite(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

/// Open (or create) a database file and bring its schema up to date.
pub fn open(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(path).map_err(sqlite)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        .map_err(sqlite)?;
    schema::run_migrations(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, StorageError> {
    let conn = Connection::open_in_memory().map_err(sqlite)?;
    schema::run_migrations(&conn)?;
    Ok(conn)
}

// ============================================================================
// Persister
// ============================================================================

/// Identity of one documentation build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub label: String,
    /// Combined sha-256 of the sources.
    pub source_hash: String,
    pub link_base: Option<String>,
}

/// What one `persist` call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub version_id: i64,
    pub label: String,
    /// Entity rows created in this call.
    pub created: usize,
    /// Nodes skipped because they were already saved.
    pub skipped: usize,
    pub parameters: usize,
    pub type_parameters: usize,
    pub interface_links: usize,
    /// Interface links stored without a target id.
    pub placeholder_links: usize,
    /// Rows whose description or remarks had link markup rewritten.
    pub rewritten: usize,
}

/// Writes a resolved [`Graph`] into the store.
#[derive(Debug, Clone)]
pub struct GraphPersister {
    version: VersionInfo,
    links: LinkRewriter,
}

struct Created {
    node: NodeId,
    table: EntityTable,
    row_id: i64,
    row: EntityRow,
}

impl GraphPersister {
    pub fn new(version: VersionInfo) -> Result<Self, StorageError> {
        let links = LinkRewriter::new(version.link_base.as_deref())?;
        Ok(GraphPersister { version, links })
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    /// Persist every attached, unsaved node of `graph`.
    ///
    /// Parents are created before children (depth-first order). Parameters, type parameters
    /// and cross references are written once every entity row exists, so references between
    /// nodes created in the same call resolve to real row ids.
    pub fn persist(
        &self,
        conn: &mut Connection,
        graph: &mut Graph,
    ) -> Result<PersistSummary, StorageError> {
        let tx = conn.transaction().map_err(sqlite)?;

        let created_at: chrono::DateTime<chrono::Utc> = SystemTime::now().into();
        let version_id = insert_version(
            &tx,
            &VersionRow {
                label: self.version.label.clone(),
                source_hash: self.version.source_hash.clone(),
                link_base: self.version.link_base.clone(),
                created_at: created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
        )?;

        let mut summary = PersistSummary {
            version_id,
            label: self.version.label.clone(),
            ..Default::default()
        };

        // Primary pass.
        let mut assigned: HashMap<NodeId, i64> = HashMap::new();
        let mut created = Vec::new();
        for id in graph.walk() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            if node.saved {
                summary.skipped += 1;
                continue;
            }
            let Some(table) = EntityTable::for_kind(node.kind()) else {
                continue;
            };
            let parent = match node.parent {
                Some(parent_id) => {
                    let parent_node = graph.node(parent_id);
                    let row_id = assigned
                        .get(&parent_id)
                        .copied()
                        .or_else(|| parent_node.and_then(|p| p.id));
                    match (parent_node, row_id) {
                        (Some(p), Some(row_id)) => Some((p.kind(), row_id)),
                        _ => {
                            return Err(StorageError::MissingParent {
                                name: node.qualified_name(),
                            })
                        }
                    }
                }
                None => None,
            };
            let row = EntityRow::from_node(node, version_id, parent);
            let row_id = table.create(&tx, &row)?;
            debug!(kind = %node.kind(), name = %row.qualified_name, row_id, "created row");
            assigned.insert(id, row_id);
            created.push(Created {
                node: id,
                table,
                row_id,
                row,
            });
        }
        summary.created = created.len();

        let row_of = |target: NodeId| -> Option<i64> {
            assigned
                .get(&target)
                .copied()
                .or_else(|| graph.node(target).and_then(|n| n.id))
        };

        // Secondary passes.
        for entry in &created {
            let Some(node) = graph.node(entry.node) else {
                continue;
            };
            self.write_owned_records(&tx, node, entry.row_id, &row_of, &mut summary)?;
            self.write_cross_references(&tx, graph, node, entry.row_id, &row_of, &mut summary)?;
        }

        for entry in &created {
            let description = self.links.rewrite(&entry.row.description);
            let remarks = self.links.rewrite(&entry.row.remarks);
            if description == entry.row.description && remarks == entry.row.remarks {
                continue;
            }
            let mut row = entry.row.clone();
            row.description = description.into_owned();
            row.remarks = remarks.into_owned();
            entry.table.update(&tx, entry.row_id, &row)?;
            summary.rewritten += 1;
        }

        tx.commit().map_err(sqlite)?;

        for (id, row_id) in assigned {
            if let Some(node) = graph.node_mut(id) {
                node.id = Some(row_id);
                node.saved = true;
            }
        }

        info!(
            version_id,
            label = %summary.label,
            created = summary.created,
            skipped = summary.skipped,
            placeholder_links = summary.placeholder_links,
            "persisted graph"
        );
        Ok(summary)
    }

    /// Parameters and type parameters owned by `node`.
    fn write_owned_records(
        &self,
        conn: &Connection,
        node: &Node,
        row_id: i64,
        row_of: &dyn Fn(NodeId) -> Option<i64>,
        summary: &mut PersistSummary,
    ) -> Result<(), StorageError> {
        if let Some(method) = node.as_method() {
            for (position, param) in method.parameters.iter().enumerate() {
                insert_parameter(
                    conn,
                    &ParameterRow {
                        method_id: row_id,
                        position,
                        name: param.name.clone(),
                        type_name: param.type_name.clone(),
                        target: type_columns(param.type_link, row_of),
                        optional: param.optional,
                        description: param.description.clone(),
                    },
                )?;
                summary.parameters += 1;
            }
        }

        for (position, tp) in node.type_parameters().iter().enumerate() {
            insert_type_parameter(
                conn,
                &TypeParameterRow {
                    owner_kind: node.kind(),
                    owner_id: row_id,
                    position,
                    name: tp.name.clone(),
                    constraint: tp.constraint.clone(),
                    description: tp.description.clone(),
                },
            )?;
            summary.type_parameters += 1;
        }
        Ok(())
    }

    fn write_cross_references(
        &self,
        conn: &Connection,
        graph: &Graph,
        node: &Node,
        row_id: i64,
        row_of: &dyn Fn(NodeId) -> Option<i64>,
        summary: &mut PersistSummary,
    ) -> Result<(), StorageError> {
        match &node.data {
            NodeData::Class(class) => {
                set_class_links(
                    conn,
                    row_id,
                    class.namespace.and_then(row_of),
                    class.extends_name.as_deref(),
                    class.extends.and_then(row_of),
                )?;
            }
            NodeData::Method(method) => {
                set_method_return(
                    conn,
                    row_id,
                    method.return_type_name.as_deref(),
                    type_columns(method.return_type, row_of),
                    &method.return_description,
                )?;
            }
            NodeData::Property(property) => {
                let target = property
                    .type_name
                    .as_deref()
                    .and_then(|name| graph.lookup_type(name))
                    .map(|(id, kind)| TypeColumns {
                        kind: Some(kind),
                        id: row_of(id),
                    })
                    .unwrap_or_default();
                set_property_type(conn, row_id, property.type_name.as_deref(), target)?;
            }
            NodeData::Event(event) => {
                set_event_type(conn, row_id, event.type_name.as_deref())?;
            }
            NodeData::Namespace(_) | NodeData::Interface(_) => {}
        }

        if let Some(interfaces) = node.interfaces() {
            for (name, entry) in interfaces {
                let interface_id = match entry {
                    InterfaceRef::Placeholder { .. } => None,
                    InterfaceRef::Resolved { node } => row_of(*node),
                };
                if interface_id.is_none() {
                    summary.placeholder_links += 1;
                }
                insert_interface_link(
                    conn,
                    &InterfaceLinkRow {
                        owner_kind: node.kind(),
                        owner_id: row_id,
                        interface_name: name.clone(),
                        interface_id,
                    },
                )?;
                summary.interface_links += 1;
            }
        }
        Ok(())
    }
}

fn type_columns(link: TypeLink, row_of: &dyn Fn(NodeId) -> Option<i64>) -> TypeColumns {
    TypeColumns {
        kind: link.kind(),
        id: link.target().and_then(row_of),
    }
}

/// Number of entity rows of `kind` stored for a version.
pub fn count_rows(
    conn: &Connection,
    kind: NodeKind,
    version_id: i64,
) -> Result<usize, StorageError> {
    match EntityTable::for_kind(kind) {
        Some(table) => table.count(conn, version_id),
        None => Ok(0),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::context::ResolutionContext;
    use docgraph_core::graph::build_graph;
    use docgraph_core::nodes::Parameter;
    use procedures::{read_interface_links, read_parameters};

    fn sample_graph() -> Graph {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat").with_description("Root {@link plat.App}."))
            .unwrap();
        ctx.add(Node::interface("IApp").with_member_of("plat")).unwrap();
        ctx.add(
            Node::class("App")
                .with_member_of("plat")
                .with_interface("plat.IApp")
                .with_interface("plat.INever"),
        )
        .unwrap();
        ctx.add(
            Node::method("start")
                .with_member_of("plat.App")
                .with_return_type("plat.IApp")
                .with_parameter(Parameter::new("app?").with_type("plat.App")),
        )
        .unwrap();
        ctx.add(
            Node::property("owner")
                .with_member_of("plat.App")
                .with_type("plat.App"),
        )
        .unwrap();
        build_graph(ctx).unwrap()
    }

    fn persister() -> GraphPersister {
        GraphPersister::new(VersionInfo {
            label: "1.0".to_string(),
            source_hash: "abc".to_string(),
            link_base: Some("https://docs.example.com".to_string()),
        })
        .unwrap()
    }

    mod primary_pass {
        use super::*;

        #[test]
        fn every_attached_node_gets_an_id() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            let summary = persister().persist(&mut conn, &mut graph).unwrap();

            assert_eq!(summary.created, 5);
            for id in graph.walk() {
                let node = graph.node(id).unwrap();
                assert!(node.saved, "{} not saved", node.name);
                assert!(node.id.is_some());
            }
        }

        #[test]
        fn children_reference_parent_rows() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            persister().persist(&mut conn, &mut graph).unwrap();

            let app = graph.node(graph.find("plat.App").unwrap()).unwrap();
            let root = graph.root("plat").unwrap();
            let row = EntityTable::Classes.read(&conn, app.id.unwrap()).unwrap();
            assert_eq!(row.parent_kind.as_deref(), Some("namespace"));
            assert_eq!(row.parent_id, root.id);
        }

        #[test]
        fn second_persist_skips_saved_nodes() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            let p = persister();
            p.persist(&mut conn, &mut graph).unwrap();
            let again = p.persist(&mut conn, &mut graph).unwrap();

            assert_eq!(again.created, 0);
            assert_eq!(again.skipped, 5);
            assert_eq!(
                count_rows(&conn, NodeKind::Class, again.version_id).unwrap(),
                0
            );
        }
    }

    mod secondary_passes {
        use super::*;

        #[test]
        fn parameter_types_use_row_ids() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            persister().persist(&mut conn, &mut graph).unwrap();

            let app_row = graph.node(graph.find("plat.App").unwrap()).unwrap().id;
            let start = graph.node(graph.find("plat.App.start").unwrap()).unwrap();
            let params = read_parameters(&conn, start.id.unwrap()).unwrap();
            assert_eq!(params.len(), 1);
            assert_eq!(params[0].name, "app");
            assert!(params[0].optional);
            assert_eq!(params[0].target.kind, Some(NodeKind::Class));
            assert_eq!(params[0].target.id, app_row);
        }

        #[test]
        fn placeholder_interfaces_store_null_id() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            let summary = persister().persist(&mut conn, &mut graph).unwrap();
            assert_eq!(summary.interface_links, 2);
            assert_eq!(summary.placeholder_links, 1);

            let app = graph.node(graph.find("plat.App").unwrap()).unwrap();
            let links = read_interface_links(&conn, NodeKind::Class, app.id.unwrap()).unwrap();
            let never = links
                .iter()
                .find(|l| l.interface_name == "plat.INever")
                .unwrap();
            assert_eq!(never.interface_id, None);
            let known = links.iter().find(|l| l.interface_name == "plat.IApp").unwrap();
            assert!(known.interface_id.is_some());
        }

        #[test]
        fn property_type_resolved_at_persist_time() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            persister().persist(&mut conn, &mut graph).unwrap();

            let owner = graph.node(graph.find("plat.App.owner").unwrap()).unwrap();
            let app_row = graph.node(graph.find("plat.App").unwrap()).unwrap().id;
            let (kind, id): (Option<String>, Option<i64>) = conn
                .query_row(
                    "SELECT type_kind, type_id FROM properties WHERE id = ?1",
                    [owner.id.unwrap()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .unwrap();
            assert_eq!(kind.as_deref(), Some("class"));
            assert_eq!(id, app_row);
        }

        #[test]
        fn descriptions_are_rewritten_in_storage_only() {
            let mut conn = open_in_memory().unwrap();
            let mut graph = sample_graph();
            let summary = persister().persist(&mut conn, &mut graph).unwrap();
            assert_eq!(summary.rewritten, 1);

            let root = graph.root("plat").unwrap();
            assert_eq!(root.description, "Root {@link plat.App}.");
            let row = EntityTable::Namespaces.read(&conn, root.id.unwrap()).unwrap();
            assert_eq!(
                row.description,
                "Root <a href=\"https://docs.example.com/plat.App\">plat.App</a>."
            );
        }
    }
}
