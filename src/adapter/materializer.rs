//! PathMaterializer: turns candidate URIs into chains of tree nodes

use super::context::UriContext;
use super::error::{AdapterError, AdapterResult};
use crate::config::AdapterConfig;
use crate::document::{
    split_segments, Content, Document, NodePath, RouteNode, RouteType, TreeNode, PLACEHOLDER_SHAPE,
};
use crate::repository::{DocumentRepository, StorageError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates, converts, relocates and removes route nodes under a base path
///
/// Holds no node state between calls; every lookup goes to the repository.
pub struct PathMaterializer {
    repository: Arc<dyn DocumentRepository>,
    base_path: NodePath,
    route_shape: String,
}

impl PathMaterializer {
    /// Create a materializer for the configured base path and route shape.
    ///
    /// Fails if the repository does not load `config.route_shape` as a
    /// route node. The base path itself is only checked when routes are
    /// created.
    pub fn new(repository: Arc<dyn DocumentRepository>, config: &AdapterConfig) -> AdapterResult<Self> {
        if !repository.is_route_shape(&config.route_shape) {
            return Err(StorageError::UnsupportedShape(config.route_shape.clone()).into());
        }
        Ok(Self {
            repository,
            base_path: config.base_path(),
            route_shape: config.route_shape.clone(),
        })
    }

    pub fn base_path(&self) -> &NodePath {
        &self.base_path
    }

    pub fn route_shape(&self) -> &str {
        &self.route_shape
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.repository
    }

    /// Resolve `ctx.uri()` under the base path and return the route node at
    /// its leaf.
    ///
    /// Missing intermediate segments are created as placeholders; existing
    /// ones are descended into whatever their shape. At the leaf, a missing
    /// node becomes a new PRIMARY route, a placeholder is converted in place,
    /// and anything else is a conflict. New nodes are pending until the
    /// caller commits.
    pub fn create_auto_route(
        &self,
        ctx: &mut UriContext<'_>,
        locale: Option<&str>,
    ) -> AdapterResult<RouteNode> {
        let mut parent = self
            .repository
            .find_by_path(&self.base_path)?
            .ok_or_else(|| AdapterError::Configuration(self.base_path.to_string()))?;

        let segments: Vec<String> = split_segments(ctx.uri())
            .into_iter()
            .map(str::to_string)
            .collect();
        let Some((head, intermediates)) = segments.split_last() else {
            return Err(AdapterError::EmptyUri(ctx.uri().to_string()));
        };

        let mut path = self.base_path.clone();
        for segment in intermediates {
            path = path.join(segment);
            parent = match self.repository.find_by_path(&path)? {
                Some(existing) => existing,
                None => {
                    debug!(path = %path, "creating placeholder");
                    self.repository
                        .create_child(parent.path(), segment, PLACEHOLDER_SHAPE)?
                }
            };
        }

        let leaf = path.join(head);
        match self.repository.find_by_path(&leaf)? {
            None => self.build_route(parent.path(), head, ctx, locale),
            Some(Document::Placeholder(node)) => {
                self.migrate_generic_to_route(&node, ctx.subject_mut(), locale, RouteType::Primary)
            }
            Some(existing) => {
                warn!(path = %leaf, shape = existing.shape(), "route path already occupied");
                Err(AdapterError::Conflict {
                    path: leaf.to_string(),
                    shape: existing.shape().to_string(),
                })
            }
        }
    }

    fn build_route(
        &self,
        parent: &NodePath,
        name: &str,
        ctx: &mut UriContext<'_>,
        locale: Option<&str>,
    ) -> AdapterResult<RouteNode> {
        let created = self.repository.create_child(parent, name, &self.route_shape)?;
        let mut route = created
            .into_route()
            .ok_or_else(|| StorageError::UnsupportedShape(self.route_shape.clone()))?;

        route.set_content(Some(ctx.subject().content_id().clone()));
        route.set_locale(locale.map(str::to_string));
        route.set_route_type(RouteType::Primary);
        for (key, value) in ctx.defaults() {
            route.set_default(key.clone(), value.clone());
        }
        self.repository.persist(&Document::Route(route.clone()))?;

        if let Some(referrers) = ctx.subject_mut().route_referrers_mut() {
            referrers.add_route(*route.id());
        }
        debug!(path = %route.path(), content = %ctx.subject().content_id(), "created route");
        Ok(route)
    }

    /// Convert a placeholder into a route node in place.
    ///
    /// The shape rewrite is committed and the node reloaded before any route
    /// field is set; the node keeps its id, path and children. Field changes
    /// made afterwards are pending until the caller commits.
    pub fn migrate_generic_to_route(
        &self,
        placeholder: &TreeNode,
        content: &mut dyn Content,
        locale: Option<&str>,
        route_type: RouteType,
    ) -> AdapterResult<RouteNode> {
        let reloaded = self.repository.convert_shape(&placeholder.id, &self.route_shape)?;
        let mut route = match reloaded {
            Document::Route(route) => route,
            other => {
                return Err(AdapterError::Migration {
                    path: placeholder.path.to_string(),
                    shape: other.shape().to_string(),
                })
            }
        };

        route.set_content(Some(content.content_id().clone()));
        route.set_locale(locale.map(str::to_string));
        route.set_route_type(route_type);
        self.repository.persist(&Document::Route(route.clone()))?;

        if let Some(referrers) = content.route_referrers_mut() {
            referrers.add_route(*route.id());
        }
        info!(path = %route.path(), content = %content.content_id(), "migrated placeholder to route");
        Ok(route)
    }

    /// Move every direct child of `source` under `dest`, keeping names and
    /// subtrees.
    ///
    /// A child whose name is already taken under `dest` fails the call with
    /// `Conflict`; children moved before it stay moved. Moves are pending
    /// until the caller commits.
    pub fn migrate_auto_route_children(&self, source: &RouteNode, dest: &RouteNode) -> AdapterResult<()> {
        for child in self.repository.children(source.path())? {
            let target = dest.path().join(child.node().name());
            if let Some(existing) = self.repository.find_by_path(&target)? {
                warn!(path = %target, "child name collision during migration");
                return Err(AdapterError::Conflict {
                    path: target.to_string(),
                    shape: existing.shape().to_string(),
                });
            }
            debug!(from = %child.path(), to = %target, "moving route child");
            self.repository.move_node(child.path(), &target)?;
        }
        Ok(())
    }

    /// Delete a route and its whole subtree, committing immediately.
    ///
    /// Back-references held by content items are left untouched.
    pub fn remove_auto_route(&self, route: &RouteNode) -> AdapterResult<()> {
        self.repository.remove_subtree(route.path())?;
        self.repository.commit()?;
        info!(path = %route.path(), "removed route");
        Ok(())
    }

    /// Turn `referring` into a redirect to `new_route`. In memory only.
    pub fn create_redirect_route(&self, referring: &mut RouteNode, new_route: &RouteNode) {
        referring.set_redirect_target(Some(*new_route.id()));
        referring.set_route_type(RouteType::Redirect);
    }

    /// Stage a route's current fields for persistence
    pub fn save_route(&self, route: &RouteNode) -> AdapterResult<()> {
        self.repository.persist(&Document::Route(route.clone()))?;
        Ok(())
    }

    /// The route node at `base + uri`, if there is one
    pub fn find_route_for_uri(&self, uri: &str) -> AdapterResult<Option<RouteNode>> {
        let path = self.base_path.join_uri(uri);
        Ok(self
            .repository
            .find_by_path(&path)?
            .and_then(Document::into_route))
    }
}

impl std::fmt::Debug for PathMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathMaterializer")
            .field("base_path", &self.base_path)
            .field("route_shape", &self.route_shape)
            .finish_non_exhaustive()
    }
}
