//! In-memory repository with unit-of-work semantics

use super::traits::{DocumentRepository, ShapeFilter, ShapeRegistry, StorageError, StorageResult};
use crate::document::{
    Content, ContentId, ContentItem, Document, DocumentId, NodePath, RouteFields, TreeNode,
    PLACEHOLDER_SHAPE,
};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A node as held by the repository: header plus optional route fields
#[derive(Debug, Clone)]
struct StoredNode {
    node: TreeNode,
    route: Option<RouteFields>,
}

impl StoredNode {
    fn from_document(document: &Document) -> Self {
        Self {
            node: document.node().clone(),
            route: document.route_fields().cloned(),
        }
    }
}

/// Committed tree plus the working copy pending writes are applied to
#[derive(Debug, Clone, Default)]
struct Session {
    committed: BTreeMap<NodePath, StoredNode>,
    working: BTreeMap<NodePath, StoredNode>,
    /// Content saved since the last commit
    staged_content: BTreeMap<ContentId, ContentItem>,
}

impl Session {
    fn path_of(&self, id: &DocumentId) -> Option<NodePath> {
        self.working
            .iter()
            .find(|(_, stored)| &stored.node.id == id)
            .map(|(path, _)| path.clone())
    }

    fn subtree(&self, root: &NodePath) -> Vec<NodePath> {
        self.working
            .range(root.clone()..)
            .map(|(path, _)| path)
            .take_while(|path| path.as_str().starts_with(root.as_str()))
            .filter(|path| root.contains(path))
            .cloned()
            .collect()
    }
}

/// Repository keeping the whole tree in memory
///
/// Tree writes go to a working copy and content writes to a staging map;
/// `commit` makes both the committed state and `rollback` restores the last
/// committed state.
#[derive(Debug)]
pub struct MemoryRepository {
    session: Mutex<Session>,
    content: DashMap<ContentId, ContentItem>,
    shapes: ShapeRegistry,
}

impl MemoryRepository {
    /// Create a repository containing only the root node
    pub fn new() -> Self {
        Self::with_shapes(ShapeRegistry::new())
    }

    /// Create a repository with a custom set of route shapes
    pub fn with_shapes(shapes: ShapeRegistry) -> Self {
        let root = StoredNode {
            node: TreeNode::new(NodePath::root(), PLACEHOLDER_SHAPE),
            route: None,
        };
        let mut committed = BTreeMap::new();
        committed.insert(NodePath::root(), root);
        Self {
            session: Mutex::new(Session {
                working: committed.clone(),
                committed,
                staged_content: BTreeMap::new(),
            }),
            content: DashMap::new(),
            shapes,
        }
    }

    /// Whether there are writes not yet committed
    pub fn has_pending(&self) -> bool {
        self.session()
            .map(|s| {
                !s.staged_content.is_empty()
                    || s.working.len() != s.committed.len()
                    || s.working.iter().zip(s.committed.iter()).any(|(w, c)| {
                        w.0 != c.0 || w.1.node != c.1.node || w.1.route != c.1.route
                    })
            })
            .unwrap_or_default()
    }

    fn session(&self) -> StorageResult<MutexGuard<'_, Session>> {
        self.session.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn materialize(&self, stored: &StoredNode) -> Document {
        self.shapes.materialize(stored.node.clone(), stored.route.clone())
    }

    /// Staged content over committed content
    fn load_content(&self, id: &ContentId) -> StorageResult<Option<ContentItem>> {
        let session = self.session()?;
        Ok(session
            .staged_content
            .get(id)
            .cloned()
            .or_else(|| self.content.get(id).map(|r| r.value().clone())))
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository for MemoryRepository {
    fn find_by_path(&self, path: &NodePath) -> StorageResult<Option<Document>> {
        let session = self.session()?;
        Ok(session.working.get(path).map(|stored| self.materialize(stored)))
    }

    fn find_by_id(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let session = self.session()?;
        Ok(session
            .working
            .values()
            .find(|stored| &stored.node.id == id)
            .map(|stored| self.materialize(stored)))
    }

    fn children(&self, path: &NodePath) -> StorageResult<Vec<Document>> {
        let session = self.session()?;
        if !session.working.contains_key(path) {
            return Err(StorageError::NodeNotFound(path.to_string()));
        }
        Ok(session
            .subtree(path)
            .iter()
            .filter(|p| p.parent().as_ref() == Some(path))
            .filter_map(|p| session.working.get(p))
            .map(|stored| self.materialize(stored))
            .collect())
    }

    fn create_child(&self, parent: &NodePath, name: &str, shape: &str) -> StorageResult<Document> {
        if name.is_empty() || name.contains(crate::document::SEPARATOR) {
            return Err(StorageError::InvalidPath(format!("{parent} + {name:?}")));
        }
        let mut session = self.session()?;
        if !session.working.contains_key(parent) {
            return Err(StorageError::NodeNotFound(parent.to_string()));
        }
        let path = parent.join(name);
        if session.working.contains_key(&path) {
            return Err(StorageError::PathExists(path.to_string()));
        }

        let stored = StoredNode {
            node: TreeNode::new(path.clone(), shape),
            route: self.shapes.is_route_shape(shape).then(RouteFields::default),
        };
        let document = self.materialize(&stored);
        session.working.insert(path.clone(), stored);
        debug!(path = %path, shape, "staged new node");
        Ok(document)
    }

    fn persist(&self, document: &Document) -> StorageResult<()> {
        let mut session = self.session()?;
        let stored = StoredNode::from_document(document);

        match session.path_of(document.id()) {
            Some(path) => {
                let mut updated = stored;
                // persist never moves a node
                updated.node.path = path.clone();
                session.working.insert(path, updated);
            }
            None => {
                let path = document.path().clone();
                if session.working.contains_key(&path) {
                    return Err(StorageError::PathExists(path.to_string()));
                }
                let parent = path
                    .parent()
                    .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
                if !session.working.contains_key(&parent) {
                    return Err(StorageError::NodeNotFound(parent.to_string()));
                }
                session.working.insert(path, stored);
            }
        }
        Ok(())
    }

    fn move_node(&self, source: &NodePath, dest: &NodePath) -> StorageResult<()> {
        if source.is_root() || source.contains(dest) {
            return Err(StorageError::InvalidPath(format!("cannot move {source} to {dest}")));
        }
        let mut session = self.session()?;
        if !session.working.contains_key(source) {
            return Err(StorageError::NodeNotFound(source.to_string()));
        }
        if session.working.contains_key(dest) {
            return Err(StorageError::PathExists(dest.to_string()));
        }
        let dest_parent = dest
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(dest.to_string()))?;
        if !session.working.contains_key(&dest_parent) {
            return Err(StorageError::NodeNotFound(dest_parent.to_string()));
        }

        for old_path in session.subtree(source) {
            if let (Some(mut stored), Some(new_path)) =
                (session.working.remove(&old_path), old_path.rebase(source, dest))
            {
                stored.node.path = new_path.clone();
                session.working.insert(new_path, stored);
            }
        }
        debug!(from = %source, to = %dest, "staged move");
        Ok(())
    }

    fn remove_subtree(&self, path: &NodePath) -> StorageResult<()> {
        if path.is_root() {
            return Err(StorageError::InvalidPath("cannot remove the root node".to_string()));
        }
        let mut session = self.session()?;
        if !session.working.contains_key(path) {
            return Err(StorageError::NodeNotFound(path.to_string()));
        }
        for doomed in session.subtree(path) {
            session.working.remove(&doomed);
        }
        debug!(path = %path, "staged subtree removal");
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        let mut session = self.session()?;
        session.committed = session.working.clone();
        for (id, item) in std::mem::take(&mut session.staged_content) {
            self.content.insert(id, item);
        }
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        let mut session = self.session()?;
        session.working = session.committed.clone();
        session.staged_content.clear();
        Ok(())
    }

    fn is_route_shape(&self, shape: &str) -> bool {
        self.shapes.is_route_shape(shape)
    }

    fn rewrite_shape(&self, id: &DocumentId, shape: &str) -> StorageResult<()> {
        let mut session = self.session()?;
        let path = session
            .path_of(id)
            .ok_or_else(|| StorageError::NodeNotFound(id.to_string()))?;
        if let Some(stored) = session.working.get_mut(&path) {
            stored.node.shape = shape.to_string();
            stored.node.touch();
        }
        Ok(())
    }

    fn save_content(&self, content: &ContentItem) -> StorageResult<()> {
        let mut item = content.clone();
        // translated views are never stored as such
        item.locale = None;
        let mut session = self.session()?;
        session.staged_content.insert(item.id.clone(), item);
        debug!(content = %content.id, "staged content");
        Ok(())
    }

    fn find_content(&self, id: &ContentId) -> StorageResult<Option<ContentItem>> {
        self.load_content(id)
    }

    fn is_translatable(&self, content: &dyn Content) -> StorageResult<bool> {
        Ok(self
            .load_content(content.content_id())?
            .map(|item| item.translatable)
            .unwrap_or(false))
    }

    fn locales_for(&self, content: &dyn Content) -> StorageResult<Vec<String>> {
        self.load_content(content.content_id())?
            .map(|item| item.locales())
            .ok_or_else(|| StorageError::ContentNotFound(content.content_id().to_string()))
    }

    fn find_translation(
        &self,
        type_name: &str,
        id: &ContentId,
        locale: &str,
    ) -> StorageResult<Option<ContentItem>> {
        Ok(self
            .load_content(id)?
            .filter(|item| item.type_name == type_name)
            .and_then(|item| item.translated(locale)))
    }

    fn find_referrers(&self, content: &ContentId, filter: &ShapeFilter) -> StorageResult<Vec<Document>> {
        let session = self.session()?;
        Ok(session
            .working
            .values()
            .filter(|stored| {
                stored
                    .route
                    .as_ref()
                    .and_then(|fields| fields.content.as_ref())
                    == Some(content)
            })
            .map(|stored| self.materialize(stored))
            .filter(|document| filter.matches(document))
            .collect())
    }
}
