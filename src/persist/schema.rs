//! Schema migrations using PRAGMA user_version.

use rusqlite::Connection;

use super::StorageError;

/// V001: versions, one table per entity kind, parameters, type parameters and interface links.
///
/// Entity tables share the common columns; kind-specific link columns start NULL and are
/// filled by the cross-reference pass.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS doc_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    source_hash TEXT NOT NULL,
    link_base TEXT,
    created_at TEXT NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1
) STRICT;

CREATE TABLE IF NOT EXISTS interfaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1
) STRICT;

CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1,
    namespace_id INTEGER,
    extends_name TEXT,
    extends_id INTEGER
) STRICT;

CREATE TABLE IF NOT EXISTS methods (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1,
    return_type_name TEXT,
    return_type_kind TEXT,
    return_type_id INTEGER,
    return_description TEXT NOT NULL DEFAULT ''
) STRICT;

CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1,
    type_name TEXT,
    type_kind TEXT,
    type_id INTEGER
) STRICT;

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES doc_versions(id),
    parent_kind TEXT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    visibility TEXT NOT NULL DEFAULT 'public',
    published INTEGER NOT NULL DEFAULT 1,
    exported INTEGER NOT NULL DEFAULT 1,
    type_name TEXT
) STRICT;

CREATE TABLE IF NOT EXISTS parameters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    method_id INTEGER NOT NULL REFERENCES methods(id),
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    type_name TEXT,
    type_kind TEXT,
    type_id INTEGER,
    optional INTEGER NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT ''
) STRICT;

CREATE TABLE IF NOT EXISTS type_parameters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_kind TEXT NOT NULL,
    owner_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    constraint_name TEXT,
    description TEXT NOT NULL DEFAULT ''
) STRICT;

CREATE TABLE IF NOT EXISTS interface_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_kind TEXT NOT NULL,
    owner_id INTEGER NOT NULL,
    interface_name TEXT NOT NULL,
    interface_id INTEGER
) STRICT;

CREATE INDEX IF NOT EXISTS idx_namespaces_qualified ON namespaces(qualified_name);
CREATE INDEX IF NOT EXISTS idx_interfaces_qualified ON interfaces(qualified_name);
CREATE INDEX IF NOT EXISTS idx_classes_qualified ON classes(qualified_name);
CREATE INDEX IF NOT EXISTS idx_methods_qualified ON methods(qualified_name);
CREATE INDEX IF NOT EXISTS idx_parameters_method ON parameters(method_id);
CREATE INDEX IF NOT EXISTS idx_interface_links_owner ON interface_links(owner_kind, owner_id);
"#;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = current_version(conn)?;

    let migrations: &[(&str, u32)] = &[(MIGRATION_SQL, 1)];

    for (sql, version) in migrations {
        if current < *version {
            conn.execute_batch(sql)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, "applied migration");
        }
    }

    Ok(())
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}
