//! SQLite repository backend

use super::traits::{
    DocumentRepository, OpenRepository, ShapeFilter, ShapeRegistry, StorageError, StorageResult,
};
use crate::document::{
    Content, ContentId, ContentItem, Document, DocumentId, NodePath, RouteFields, TreeNode,
    PLACEHOLDER_SHAPE, SEPARATOR,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Columns every node query selects, in this order
const NODE_COLUMNS: &str = "id, path, shape, route_json, metadata_json";

/// Raw node row: (id, path, shape, route_json, metadata_json)
type NodeRow = (String, String, String, Option<String>, String);

/// SQLite-backed document repository
///
/// Uses a single SQLite database file with a `nodes` table for the route
/// tree and `content` / `content_translations` tables for content items.
/// Thread-safe via internal mutex on the connection.
///
/// The first write after a commit opens a transaction; pending writes live
/// in it (and are visible to reads on the same connection) until `commit`
/// or `rollback`.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
    shapes: ShapeRegistry,
}

impl SqliteRepository {
    /// Use a custom set of route shapes
    pub fn with_shapes(mut self, shapes: ShapeRegistry) -> Self {
        self.shapes = shapes;
        self
    }

    /// Initialize the database schema and the root node
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Route tree
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                parent_path TEXT,
                shape TEXT NOT NULL,
                route_json TEXT,
                content_id TEXT,
                metadata_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_parent
                ON nodes(parent_path);
            CREATE INDEX IF NOT EXISTS idx_nodes_content
                ON nodes(content_id);

            -- Content items
            CREATE TABLE IF NOT EXISTS content (
                id TEXT PRIMARY KEY,
                type_name TEXT NOT NULL,
                translatable INTEGER NOT NULL,
                fields_json TEXT NOT NULL,
                routes_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS content_translations (
                content_id TEXT NOT NULL,
                locale TEXT NOT NULL,
                fields_json TEXT NOT NULL,
                PRIMARY KEY (content_id, locale),
                FOREIGN KEY (content_id) REFERENCES content(id) ON DELETE CASCADE
            );

            PRAGMA foreign_keys = ON;

            PRAGMA journal_mode = WAL;
            "#,
        )?;

        let root = TreeNode::new(NodePath::root(), PLACEHOLDER_SHAPE);
        conn.execute(
            r#"
            INSERT OR IGNORE INTO nodes (id, path, parent_path, shape, route_json, content_id, metadata_json)
            VALUES (?1, ?2, NULL, ?3, NULL, NULL, ?4)
            "#,
            params![
                root.id.to_string(),
                root.path.as_str(),
                root.shape,
                serde_json::to_string(&root.metadata)?,
            ],
        )?;

        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Open a transaction unless one is already pending
    fn begin(conn: &Connection) -> StorageResult<()> {
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    /// Deserialize a node row and materialize it by shape
    fn row_to_document(&self, row: NodeRow) -> StorageResult<Document> {
        let (id, path, shape, route_json, metadata_json) = row;
        let node = TreeNode {
            id: DocumentId::parse(&id).map_err(|e| StorageError::InvalidId(format!("{id}: {e}")))?,
            path: NodePath::new(path),
            shape,
            metadata: serde_json::from_str(&metadata_json)?,
        };
        let fields = route_json
            .map(|json| serde_json::from_str::<RouteFields>(&json))
            .transpose()?;
        Ok(self.shapes.materialize(node, fields))
    }

    fn query_one(
        &self,
        conn: &Connection,
        filter: &str,
        param: &str,
    ) -> StorageResult<Option<Document>> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE {filter}");
        let row = conn
            .query_row(&sql, params![param], Self::read_row)
            .optional()?;
        row.map(|r| self.row_to_document(r)).transpose()
    }

    fn query_many(&self, conn: &Connection, filter: &str, param: &str) -> StorageResult<Vec<Document>> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE {filter} ORDER BY path");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![param], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|r| self.row_to_document(r)).collect()
    }

    fn path_exists(conn: &Connection, path: &NodePath) -> StorageResult<bool> {
        Ok(conn
            .query_row("SELECT 1 FROM nodes WHERE path = ?1", params![path.as_str()], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn insert_node(conn: &Connection, document: &Document) -> StorageResult<()> {
        let node = document.node();
        let fields = document.route_fields();
        conn.execute(
            r#"
            INSERT INTO nodes (id, path, parent_path, shape, route_json, content_id, metadata_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                node.id.to_string(),
                node.path.as_str(),
                node.path.parent().map(|p| p.to_string()),
                node.shape,
                fields.map(serde_json::to_string).transpose()?,
                fields.and_then(|f| f.content.as_ref()).map(|c| c.as_str().to_string()),
                serde_json::to_string(&node.metadata)?,
            ],
        )?;
        Ok(())
    }

    fn load_content(conn: &Connection, id: &ContentId) -> StorageResult<Option<ContentItem>> {
        let row: Option<(String, bool, String, String, String)> = conn
            .query_row(
                "SELECT type_name, translatable, fields_json, routes_json, metadata_json
                 FROM content WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        let Some((type_name, translatable, fields_json, routes_json, metadata_json)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT locale, fields_json FROM content_translations WHERE content_id = ?1 ORDER BY locale",
        )?;
        let mut translations = BTreeMap::new();
        for row in stmt.query_map(params![id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (locale, fields) = row?;
            translations.insert(locale, serde_json::from_str(&fields)?);
        }

        Ok(Some(ContentItem {
            id: id.clone(),
            type_name,
            translatable,
            locale: None,
            fields: serde_json::from_str(&fields_json)?,
            translations,
            routes: serde_json::from_str(&routes_json)?,
            metadata: serde_json::from_str(&metadata_json)?,
        }))
    }
}

impl OpenRepository for SqliteRepository {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            shapes: ShapeRegistry::new(),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            shapes: ShapeRegistry::new(),
        })
    }
}

impl DocumentRepository for SqliteRepository {
    // === Tree Operations ===

    fn find_by_path(&self, path: &NodePath) -> StorageResult<Option<Document>> {
        let conn = self.conn()?;
        self.query_one(&conn, "path = ?1", path.as_str())
    }

    fn find_by_id(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let conn = self.conn()?;
        self.query_one(&conn, "id = ?1", &id.to_string())
    }

    fn children(&self, path: &NodePath) -> StorageResult<Vec<Document>> {
        let conn = self.conn()?;
        if !Self::path_exists(&conn, path)? {
            return Err(StorageError::NodeNotFound(path.to_string()));
        }
        self.query_many(&conn, "parent_path = ?1", path.as_str())
    }

    fn create_child(&self, parent: &NodePath, name: &str, shape: &str) -> StorageResult<Document> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(StorageError::InvalidPath(format!("{parent} + {name:?}")));
        }
        let conn = self.conn()?;
        if !Self::path_exists(&conn, parent)? {
            return Err(StorageError::NodeNotFound(parent.to_string()));
        }
        let path = parent.join(name);
        if Self::path_exists(&conn, &path)? {
            return Err(StorageError::PathExists(path.to_string()));
        }

        let fields = self.shapes.is_route_shape(shape).then(RouteFields::default);
        let document = self.shapes.materialize(TreeNode::new(path.clone(), shape), fields);

        Self::begin(&conn)?;
        Self::insert_node(&conn, &document)?;
        debug!(path = %path, shape, "staged new node");
        Ok(document)
    }

    fn persist(&self, document: &Document) -> StorageResult<()> {
        let conn = self.conn()?;
        let known = conn
            .query_row(
                "SELECT 1 FROM nodes WHERE id = ?1",
                params![document.id().to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        Self::begin(&conn)?;
        if known {
            let node = document.node();
            let fields = document.route_fields();
            conn.execute(
                r#"
                UPDATE nodes SET
                    shape = ?2,
                    route_json = ?3,
                    content_id = ?4,
                    metadata_json = ?5
                WHERE id = ?1
                "#,
                params![
                    node.id.to_string(),
                    node.shape,
                    fields.map(serde_json::to_string).transpose()?,
                    fields.and_then(|f| f.content.as_ref()).map(|c| c.as_str().to_string()),
                    serde_json::to_string(&node.metadata)?,
                ],
            )?;
            return Ok(());
        }

        let path = document.path();
        if Self::path_exists(&conn, path)? {
            return Err(StorageError::PathExists(path.to_string()));
        }
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        if !Self::path_exists(&conn, &parent)? {
            return Err(StorageError::NodeNotFound(parent.to_string()));
        }
        Self::insert_node(&conn, document)
    }

    fn move_node(&self, source: &NodePath, dest: &NodePath) -> StorageResult<()> {
        if source.is_root() || source.contains(dest) {
            return Err(StorageError::InvalidPath(format!("cannot move {source} to {dest}")));
        }
        let conn = self.conn()?;
        if !Self::path_exists(&conn, source)? {
            return Err(StorageError::NodeNotFound(source.to_string()));
        }
        if Self::path_exists(&conn, dest)? {
            return Err(StorageError::PathExists(dest.to_string()));
        }
        let dest_parent = dest
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(dest.to_string()))?;
        if !Self::path_exists(&conn, &dest_parent)? {
            return Err(StorageError::NodeNotFound(dest_parent.to_string()));
        }

        let subtree: Vec<(String, String)> = {
            let mut stmt = conn.prepare(
                "SELECT id, path FROM nodes
                 WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
            )?;
            let rows = stmt
                .query_map(params![source.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Self::begin(&conn)?;
        for (id, path) in subtree {
            let old_path = NodePath::new(path);
            let Some(new_path) = old_path.rebase(source, dest) else {
                continue;
            };
            conn.execute(
                "UPDATE nodes SET path = ?2, parent_path = ?3 WHERE id = ?1",
                params![
                    id,
                    new_path.as_str(),
                    new_path.parent().map(|p| p.to_string()),
                ],
            )?;
        }
        debug!(from = %source, to = %dest, "staged move");
        Ok(())
    }

    fn remove_subtree(&self, path: &NodePath) -> StorageResult<()> {
        if path.is_root() {
            return Err(StorageError::InvalidPath("cannot remove the root node".to_string()));
        }
        let conn = self.conn()?;
        if !Self::path_exists(&conn, path)? {
            return Err(StorageError::NodeNotFound(path.to_string()));
        }
        Self::begin(&conn)?;
        conn.execute(
            "DELETE FROM nodes WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
            params![path.as_str()],
        )?;
        debug!(path = %path, "staged subtree removal");
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // === Shape Operations ===

    fn is_route_shape(&self, shape: &str) -> bool {
        self.shapes.is_route_shape(shape)
    }

    fn rewrite_shape(&self, id: &DocumentId, shape: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        Self::begin(&conn)?;
        let rows = conn.execute(
            "UPDATE nodes SET shape = ?2 WHERE id = ?1",
            params![id.to_string(), shape],
        )?;
        if rows == 0 {
            return Err(StorageError::NodeNotFound(id.to_string()));
        }
        Ok(())
    }

    // === Content Operations ===

    fn save_content(&self, content: &ContentItem) -> StorageResult<()> {
        let conn = self.conn()?;
        Self::begin(&conn)?;
        conn.execute(
            r#"
            INSERT INTO content (id, type_name, translatable, fields_json, routes_json, metadata_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                type_name = excluded.type_name,
                translatable = excluded.translatable,
                fields_json = excluded.fields_json,
                routes_json = excluded.routes_json,
                metadata_json = excluded.metadata_json
            "#,
            params![
                content.id.as_str(),
                content.type_name,
                content.translatable,
                serde_json::to_string(&content.fields)?,
                serde_json::to_string(&content.routes)?,
                serde_json::to_string(&content.metadata)?,
            ],
        )?;

        conn.execute(
            "DELETE FROM content_translations WHERE content_id = ?1",
            params![content.id.as_str()],
        )?;
        for (locale, fields) in &content.translations {
            conn.execute(
                "INSERT INTO content_translations (content_id, locale, fields_json) VALUES (?1, ?2, ?3)",
                params![content.id.as_str(), locale, serde_json::to_string(fields)?],
            )?;
        }

        Ok(())
    }

    fn find_content(&self, id: &ContentId) -> StorageResult<Option<ContentItem>> {
        let conn = self.conn()?;
        Self::load_content(&conn, id)
    }

    fn is_translatable(&self, content: &dyn Content) -> StorageResult<bool> {
        let conn = self.conn()?;
        let translatable: Option<bool> = conn
            .query_row(
                "SELECT translatable FROM content WHERE id = ?1",
                params![content.content_id().as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(translatable.unwrap_or(false))
    }

    fn locales_for(&self, content: &dyn Content) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        Self::load_content(&conn, content.content_id())?
            .map(|item| item.locales())
            .ok_or_else(|| StorageError::ContentNotFound(content.content_id().to_string()))
    }

    fn find_translation(
        &self,
        type_name: &str,
        id: &ContentId,
        locale: &str,
    ) -> StorageResult<Option<ContentItem>> {
        let conn = self.conn()?;
        Ok(Self::load_content(&conn, id)?
            .filter(|item| item.type_name == type_name)
            .and_then(|item| item.translated(locale)))
    }

    fn find_referrers(&self, content: &ContentId, filter: &ShapeFilter) -> StorageResult<Vec<Document>> {
        let conn = self.conn()?;
        Ok(self
            .query_many(&conn, "content_id = ?1", content.as_str())?
            .into_iter()
            .filter(|document| filter.matches(document))
            .collect())
    }
}
