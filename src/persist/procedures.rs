//! Per-kind create/read/update procedures and the link-table writers.

use rusqlite::{params, Connection, OptionalExtension};

use docgraph_core::nodes::{Node, NodeKind};

use super::StorageError;

fn sqlite(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

// ============================================================================
// Entity Rows
// ============================================================================

/// The common columns every entity table carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub version_id: i64,
    pub parent_kind: Option<String>,
    pub parent_id: Option<i64>,
    pub name: String,
    pub qualified_name: String,
    pub description: String,
    pub remarks: String,
    pub visibility: String,
    pub published: bool,
    pub exported: bool,
}

impl EntityRow {
    /// Row for a node whose parent (if any) was persisted as `parent`.
    pub fn from_node(node: &Node, version_id: i64, parent: Option<(NodeKind, i64)>) -> Self {
        EntityRow {
            version_id,
            parent_kind: parent.map(|(kind, _)| kind.as_str().to_string()),
            parent_id: parent.map(|(_, id)| id),
            name: node.name.clone(),
            qualified_name: node.qualified_name(),
            description: node.description.clone(),
            remarks: node.remarks.clone(),
            visibility: node.visibility.as_str().to_string(),
            published: node.published,
            exported: node.exported,
        }
    }
}

/// The entity tables, one per persisted kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Namespaces,
    Interfaces,
    Classes,
    Methods,
    Properties,
    Events,
}

impl EntityTable {
    pub fn for_kind(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Namespace => Some(EntityTable::Namespaces),
            NodeKind::Interface => Some(EntityTable::Interfaces),
            NodeKind::Class => Some(EntityTable::Classes),
            NodeKind::Method => Some(EntityTable::Methods),
            NodeKind::Property => Some(EntityTable::Properties),
            NodeKind::Event => Some(EntityTable::Events),
            NodeKind::Parameter | NodeKind::TypeParameter => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityTable::Namespaces => "namespaces",
            EntityTable::Interfaces => "interfaces",
            EntityTable::Classes => "classes",
            EntityTable::Methods => "methods",
            EntityTable::Properties => "properties",
            EntityTable::Events => "events",
        }
    }

    /// Insert a row and return its id.
    pub fn create(self, conn: &Connection, row: &EntityRow) -> Result<i64, StorageError> {
        let sql = format!(
            "INSERT INTO {}
             (version_id, parent_kind, parent_id, name, qualified_name, description, remarks,
              visibility, published, exported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            self.name()
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(sqlite)?;
        stmt.execute(params![
            row.version_id,
            row.parent_kind,
            row.parent_id,
            row.name,
            row.qualified_name,
            row.description,
            row.remarks,
            row.visibility,
            row.published,
            row.exported,
        ])
        .map_err(sqlite)?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite the common columns of an existing row.
    pub fn update(self, conn: &Connection, id: i64, row: &EntityRow) -> Result<(), StorageError> {
        let sql = format!(
            "UPDATE {}
             SET parent_kind = ?2, parent_id = ?3, name = ?4, qualified_name = ?5,
                 description = ?6, remarks = ?7, visibility = ?8, published = ?9, exported = ?10
             WHERE id = ?1",
            self.name()
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(sqlite)?;
        let changed = stmt
            .execute(params![
                id,
                row.parent_kind,
                row.parent_id,
                row.name,
                row.qualified_name,
                row.description,
                row.remarks,
                row.visibility,
                row.published,
                row.exported,
            ])
            .map_err(sqlite)?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                table: self.name(),
                id,
            });
        }
        Ok(())
    }

    pub fn read(self, conn: &Connection, id: i64) -> Result<EntityRow, StorageError> {
        let sql = format!(
            "SELECT version_id, parent_kind, parent_id, name, qualified_name, description,
                    remarks, visibility, published, exported
             FROM {} WHERE id = ?1",
            self.name()
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(sqlite)?;
        stmt.query_row(params![id], |row| {
            Ok(EntityRow {
                version_id: row.get(0)?,
                parent_kind: row.get(1)?,
                parent_id: row.get(2)?,
                name: row.get(3)?,
                qualified_name: row.get(4)?,
                description: row.get(5)?,
                remarks: row.get(6)?,
                visibility: row.get(7)?,
                published: row.get(8)?,
                exported: row.get(9)?,
            })
        })
        .optional()
        .map_err(sqlite)?
        .ok_or(StorageError::NotFound {
            table: self.name(),
            id,
        })
    }

    /// Look up a row id by qualified name within a version.
    pub fn find(
        self,
        conn: &Connection,
        version_id: i64,
        qualified_name: &str,
    ) -> Result<Option<i64>, StorageError> {
        let sql = format!(
            "SELECT id FROM {} WHERE version_id = ?1 AND qualified_name = ?2 ORDER BY id LIMIT 1",
            self.name()
        );
        let mut stmt = conn.prepare_cached(&sql).map_err(sqlite)?;
        stmt.query_row(params![version_id, qualified_name], |row| row.get(0))
            .optional()
            .map_err(sqlite)
    }

    pub fn count(self, conn: &Connection, version_id: i64) -> Result<usize, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE version_id = ?1", self.name());
        let mut stmt = conn.prepare_cached(&sql).map_err(sqlite)?;
        let count: i64 = stmt
            .query_row(params![version_id], |row| row.get(0))
            .map_err(sqlite)?;
        Ok(count as usize)
    }
}

// ============================================================================
// Versions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRow {
    pub label: String,
    pub source_hash: String,
    pub link_base: Option<String>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

pub fn insert_version(conn: &Connection, row: &VersionRow) -> Result<i64, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO doc_versions (label, source_hash, link_base, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(sqlite)?;
    stmt.execute(params![row.label, row.source_hash, row.link_base, row.created_at])
        .map_err(sqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn read_version(conn: &Connection, id: i64) -> Result<VersionRow, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT label, source_hash, link_base, created_at FROM doc_versions WHERE id = ?1",
        )
        .map_err(sqlite)?;
    stmt.query_row(params![id], |row| {
        Ok(VersionRow {
            label: row.get(0)?,
            source_hash: row.get(1)?,
            link_base: row.get(2)?,
            created_at: row.get(3)?,
        })
    })
    .optional()
    .map_err(sqlite)?
    .ok_or(StorageError::NotFound {
        table: "doc_versions",
        id,
    })
}

// ============================================================================
// Cross-reference Columns
// ============================================================================

/// A resolved type reference as stored: the kind of the target and its row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeColumns {
    pub kind: Option<NodeKind>,
    pub id: Option<i64>,
}

pub fn set_class_links(
    conn: &Connection,
    class_id: i64,
    namespace_id: Option<i64>,
    extends_name: Option<&str>,
    extends_id: Option<i64>,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE classes SET namespace_id = ?2, extends_name = ?3, extends_id = ?4 WHERE id = ?1",
        )
        .map_err(sqlite)?;
    stmt.execute(params![class_id, namespace_id, extends_name, extends_id])
        .map_err(sqlite)?;
    Ok(())
}

pub fn set_method_return(
    conn: &Connection,
    method_id: i64,
    type_name: Option<&str>,
    target: TypeColumns,
    description: &str,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE methods
             SET return_type_name = ?2, return_type_kind = ?3, return_type_id = ?4,
                 return_description = ?5
             WHERE id = ?1",
        )
        .map_err(sqlite)?;
    stmt.execute(params![
        method_id,
        type_name,
        target.kind.map(|k| k.as_str()),
        target.id,
        description,
    ])
    .map_err(sqlite)?;
    Ok(())
}

pub fn set_property_type(
    conn: &Connection,
    property_id: i64,
    type_name: Option<&str>,
    target: TypeColumns,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached("UPDATE properties SET type_name = ?2, type_kind = ?3, type_id = ?4 WHERE id = ?1")
        .map_err(sqlite)?;
    stmt.execute(params![
        property_id,
        type_name,
        target.kind.map(|k| k.as_str()),
        target.id,
    ])
    .map_err(sqlite)?;
    Ok(())
}

pub fn set_event_type(
    conn: &Connection,
    event_id: i64,
    type_name: Option<&str>,
) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached("UPDATE events SET type_name = ?2 WHERE id = ?1")
        .map_err(sqlite)?;
    stmt.execute(params![event_id, type_name]).map_err(sqlite)?;
    Ok(())
}

// ============================================================================
// Link Tables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub method_id: i64,
    pub position: usize,
    pub name: String,
    pub type_name: Option<String>,
    pub target: TypeColumns,
    pub optional: bool,
    pub description: String,
}

pub fn insert_parameter(conn: &Connection, row: &ParameterRow) -> Result<i64, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO parameters
             (method_id, position, name, type_name, type_kind, type_id, optional, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(sqlite)?;
    stmt.execute(params![
        row.method_id,
        row.position as i64,
        row.name,
        row.type_name,
        row.target.kind.map(|k| k.as_str()),
        row.target.id,
        row.optional,
        row.description,
    ])
    .map_err(sqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Parameters of a method in declaration order.
pub fn read_parameters(
    conn: &Connection,
    method_id: i64,
) -> Result<Vec<ParameterRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT method_id, position, name, type_name, type_kind, type_id, optional, description
             FROM parameters WHERE method_id = ?1 ORDER BY position",
        )
        .map_err(sqlite)?;
    let rows = stmt
        .query_map(params![method_id], |row| {
            let position: i64 = row.get(1)?;
            let kind: Option<String> = row.get(4)?;
            Ok(ParameterRow {
                method_id: row.get(0)?,
                position: position as usize,
                name: row.get(2)?,
                type_name: row.get(3)?,
                target: TypeColumns {
                    kind: kind.as_deref().and_then(kind_from_str),
                    id: row.get(5)?,
                },
                optional: row.get(6)?,
                description: row.get(7)?,
            })
        })
        .map_err(sqlite)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqlite)?);
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameterRow {
    pub owner_kind: NodeKind,
    pub owner_id: i64,
    pub position: usize,
    pub name: String,
    pub constraint: Option<String>,
    pub description: String,
}

pub fn insert_type_parameter(
    conn: &Connection,
    row: &TypeParameterRow,
) -> Result<i64, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO type_parameters
             (owner_kind, owner_id, position, name, constraint_name, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(sqlite)?;
    stmt.execute(params![
        row.owner_kind.as_str(),
        row.owner_id,
        row.position as i64,
        row.name,
        row.constraint,
        row.description,
    ])
    .map_err(sqlite)?;
    Ok(conn.last_insert_rowid())
}

/// An implements/extends entry. `interface_id` is NULL for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceLinkRow {
    pub owner_kind: NodeKind,
    pub owner_id: i64,
    pub interface_name: String,
    pub interface_id: Option<i64>,
}

pub fn insert_interface_link(
    conn: &Connection,
    row: &InterfaceLinkRow,
) -> Result<i64, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO interface_links (owner_kind, owner_id, interface_name, interface_id)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(sqlite)?;
    stmt.execute(params![
        row.owner_kind.as_str(),
        row.owner_id,
        row.interface_name,
        row.interface_id,
    ])
    .map_err(sqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn read_interface_links(
    conn: &Connection,
    owner_kind: NodeKind,
    owner_id: i64,
) -> Result<Vec<InterfaceLinkRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT interface_name, interface_id FROM interface_links
             WHERE owner_kind = ?1 AND owner_id = ?2 ORDER BY interface_name",
        )
        .map_err(sqlite)?;
    let rows = stmt
        .query_map(params![owner_kind.as_str(), owner_id], |row| {
            Ok(InterfaceLinkRow {
                owner_kind,
                owner_id,
                interface_name: row.get(0)?,
                interface_id: row.get(1)?,
            })
        })
        .map_err(sqlite)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqlite)?);
    }
    Ok(result)
}

fn kind_from_str(kind: &str) -> Option<NodeKind> {
    match kind {
        "namespace" => Some(NodeKind::Namespace),
        "interface" => Some(NodeKind::Interface),
        "class" => Some(NodeKind::Class),
        "method" => Some(NodeKind::Method),
        "property" => Some(NodeKind::Property),
        "event" => Some(NodeKind::Event),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
