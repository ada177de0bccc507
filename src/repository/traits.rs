//! Repository trait definitions

use crate::document::{
    Content, ContentId, ContentItem, Document, DocumentId, NodePath, RouteFields, TreeNode,
    AUTO_ROUTE_SHAPE, PLACEHOLDER_SHAPE,
};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A node already exists at path: {0}")]
    PathExists(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Shape \"{0}\" is not a route shape known to this repository")]
    UnsupportedShape(String),

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Invalid stored identifier: {0}")]
    InvalidId(String),

    #[error("Repository lock poisoned")]
    LockPoisoned,
}

/// Result type for repository operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Which nodes a referrer query returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShapeFilter {
    /// Every node referring to the content
    #[default]
    Any,
    /// Only nodes materialized as route nodes
    Routes,
    /// Only nodes stored with exactly this shape
    Shape(String),
}

impl ShapeFilter {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            ShapeFilter::Any => true,
            ShapeFilter::Routes => document.is_route(),
            ShapeFilter::Shape(shape) => document.shape() == shape,
        }
    }
}

/// The set of stored shapes a repository materializes as route nodes
///
/// Everything that is neither the placeholder shape nor a registered route
/// shape loads as `Document::Foreign`.
#[derive(Debug, Clone)]
pub struct ShapeRegistry {
    route_shapes: BTreeSet<String>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        let mut route_shapes = BTreeSet::new();
        route_shapes.insert(AUTO_ROUTE_SHAPE.to_string());
        Self { route_shapes }
    }

    /// Register an additional route shape
    pub fn with_route_shape(mut self, shape: impl Into<String>) -> Self {
        self.route_shapes.insert(shape.into());
        self
    }

    pub fn is_route_shape(&self, shape: &str) -> bool {
        shape != PLACEHOLDER_SHAPE && self.route_shapes.contains(shape)
    }

    /// Decide the document kind for a stored node
    pub fn materialize(&self, node: TreeNode, fields: Option<RouteFields>) -> Document {
        if node.shape == PLACEHOLDER_SHAPE {
            Document::Placeholder(node)
        } else if self.is_route_shape(&node.shape) {
            Document::Route(crate::document::RouteNode::new(node, fields.unwrap_or_default()))
        } else {
            Document::Foreign(node)
        }
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for path-addressed document repositories
///
/// Writes (`create_child`, `persist`, `move_node`, `remove_subtree`,
/// `rewrite_shape`, `save_content`) are pending until `commit` and dropped
/// by `rollback`; tree and content writes share one unit of work. Reads see
/// pending writes.
/// Exactly one node may exist at any path; violations fail with
/// `StorageError::PathExists`.
///
/// Implementations must be thread-safe (Send + Sync), but give no
/// isolation between callers sharing one instance.
pub trait DocumentRepository: Send + Sync {
    // === Tree Operations ===

    /// Load the node at `path`
    fn find_by_path(&self, path: &NodePath) -> StorageResult<Option<Document>>;

    /// Load a node by id
    fn find_by_id(&self, id: &DocumentId) -> StorageResult<Option<Document>>;

    /// Direct children of the node at `path`, ordered by path
    fn children(&self, path: &NodePath) -> StorageResult<Vec<Document>>;

    /// Create a node named `name` under `parent` with the given shape
    ///
    /// Route shapes start with empty route fields.
    fn create_child(&self, parent: &NodePath, name: &str, shape: &str) -> StorageResult<Document>;

    /// Register a document's current state for persistence
    ///
    /// Known ids are updated in place (the path is not changed by persist);
    /// unknown ids are inserted at their path.
    fn persist(&self, document: &Document) -> StorageResult<()>;

    /// Move the node at `source` and its subtree to `dest`
    fn move_node(&self, source: &NodePath, dest: &NodePath) -> StorageResult<()>;

    /// Delete the node at `path` and its subtree
    fn remove_subtree(&self, path: &NodePath) -> StorageResult<()>;

    /// Flush pending writes
    fn commit(&self) -> StorageResult<()>;

    /// Discard pending writes
    fn rollback(&self) -> StorageResult<()>;

    // === Shape Operations ===

    /// Whether `shape` loads as a route node
    fn is_route_shape(&self, shape: &str) -> bool;

    /// Rewrite the stored shape of a node
    ///
    /// The change is only visible through documents loaded after a
    /// `commit`; use `convert_shape` rather than calling this directly.
    fn rewrite_shape(&self, id: &DocumentId, shape: &str) -> StorageResult<()>;

    /// Load a fresh copy of a node
    fn reload(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        self.find_by_id(id)
    }

    /// Change a node's shape in place: rewrite, commit and reload.
    ///
    /// Returns the reloaded document. Its variant reflects what the
    /// repository materialized, which callers must check.
    fn convert_shape(&self, id: &DocumentId, shape: &str) -> StorageResult<Document> {
        self.rewrite_shape(id, shape)?;
        self.commit()?;
        self.reload(id)?
            .ok_or_else(|| StorageError::NodeNotFound(id.to_string()))
    }

    /// Create every missing node along `path` as a placeholder and commit
    fn provision_path(&self, path: &NodePath) -> StorageResult<Document> {
        let mut current = self
            .find_by_path(&NodePath::root())?
            .ok_or_else(|| StorageError::NodeNotFound(NodePath::root().to_string()))?;
        for segment in path.segments() {
            let next = current.path().join(segment);
            current = match self.find_by_path(&next)? {
                Some(document) => document,
                None => self.create_child(current.path(), segment, PLACEHOLDER_SHAPE)?,
            };
        }
        self.commit()?;
        Ok(current)
    }

    // === Content Operations ===

    /// Create or replace a content item; pending until `commit`
    fn save_content(&self, content: &ContentItem) -> StorageResult<()>;

    /// Load a content item by id, untranslated
    fn find_content(&self, id: &ContentId) -> StorageResult<Option<ContentItem>>;

    /// Whether the content item has per-locale translations
    fn is_translatable(&self, content: &dyn Content) -> StorageResult<bool>;

    /// Locales the content item is translated into
    fn locales_for(&self, content: &dyn Content) -> StorageResult<Vec<String>>;

    /// Load content of type `type_name` with id `id` in `locale`
    ///
    /// Returns `None` if the item does not exist, has another type, or has no
    /// translation for `locale`.
    fn find_translation(
        &self,
        type_name: &str,
        id: &ContentId,
        locale: &str,
    ) -> StorageResult<Option<ContentItem>>;

    /// Nodes whose content reference points at `content`
    fn find_referrers(&self, content: &ContentId, filter: &ShapeFilter) -> StorageResult<Vec<Document>>;
}

/// Extension trait for opening repositories from paths
pub trait OpenRepository: DocumentRepository + Sized {
    /// Open or create a repository at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory repository (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RouteNode, RouteType};

    #[test]
    fn test_registry_materializes_by_shape() {
        let registry = ShapeRegistry::new().with_route_shape("custom_route");

        let placeholder = TreeNode::new(NodePath::new("/a"), PLACEHOLDER_SHAPE);
        assert!(registry.materialize(placeholder, None).is_placeholder());

        let route = TreeNode::new(NodePath::new("/b"), "custom_route");
        let fields = RouteFields {
            route_type: RouteType::Redirect,
            ..Default::default()
        };
        let doc = registry.materialize(route, Some(fields));
        assert_eq!(doc.as_route().map(RouteNode::route_type), Some(RouteType::Redirect));

        let other = TreeNode::new(NodePath::new("/c"), "article");
        assert!(matches!(registry.materialize(other, None), Document::Foreign(_)));
    }

    #[test]
    fn test_placeholder_shape_is_never_a_route_shape() {
        let registry = ShapeRegistry::new().with_route_shape(PLACEHOLDER_SHAPE);
        assert!(!registry.is_route_shape(PLACEHOLDER_SHAPE));
        assert!(registry.is_route_shape(AUTO_ROUTE_SHAPE));
    }

    #[test]
    fn test_shape_filter() {
        let route = Document::Route(RouteNode::new(
            TreeNode::new(NodePath::new("/r"), AUTO_ROUTE_SHAPE),
            RouteFields::default(),
        ));
        let foreign = Document::Foreign(TreeNode::new(NodePath::new("/f"), "menu_item"));

        assert!(ShapeFilter::Any.matches(&foreign));
        assert!(ShapeFilter::Routes.matches(&route));
        assert!(!ShapeFilter::Routes.matches(&foreign));
        assert!(ShapeFilter::Shape("menu_item".to_string()).matches(&foreign));
    }
}
