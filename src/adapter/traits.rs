//! AutoRouteAdapter: the contract the reconciliation engine calls

use super::comparator::RouteComparator;
use super::context::UriContext;
use super::error::AdapterResult;
use super::materializer::PathMaterializer;
use crate::config::AdapterConfig;
use crate::document::{Content, ContentItem, RouteNode};
use crate::repository::DocumentRepository;
use std::sync::Arc;

/// Everything the reconciliation engine needs from the storage side.
///
/// The engine decides which URIs should exist for a content item; the
/// adapter materializes them, reshapes the tree when they change and
/// answers identity and locale questions. Committing is left to the caller
/// except where an operation says otherwise.
pub trait AutoRouteAdapter: Send + Sync {
    /// Locales the content is translated into
    fn get_locales(&self, content: &dyn Content) -> AdapterResult<Vec<String>>;

    /// The content as loaded in `locale`
    fn translate_object(&self, content: &dyn Content, locale: &str) -> AdapterResult<Option<ContentItem>>;

    /// Locale tag disambiguating same-path routes across languages
    fn generate_auto_route_tag(&self, ctx: &UriContext<'_>) -> String;

    /// Move the children of a superseded route under its replacement
    fn migrate_auto_route_children(&self, source: &RouteNode, dest: &RouteNode) -> AdapterResult<()>;

    /// Delete a route and its subtree, committing immediately
    fn remove_auto_route(&self, route: &RouteNode) -> AdapterResult<()>;

    /// Materialize the route node for `ctx.uri()`
    fn create_auto_route(&self, ctx: &mut UriContext<'_>, locale: Option<&str>) -> AdapterResult<RouteNode>;

    /// Make `referring` redirect to `new_route` (in memory)
    fn create_redirect_route(&self, referring: &mut RouteNode, new_route: &RouteNode);

    /// Stage a mutated route for persistence
    fn save_route(&self, route: &RouteNode) -> AdapterResult<()>;

    fn get_real_class_name(&self, type_name: &str) -> String;

    fn compare_auto_route_content(&self, route: &RouteNode, content: &dyn Content) -> bool;

    fn compare_auto_route_locale(&self, route: &RouteNode, locale: Option<&str>) -> bool;

    /// Routes whose content reference is this item
    fn get_referring_auto_routes(&self, content: &dyn Content) -> AdapterResult<Vec<RouteNode>>;

    /// The route at a URI relative to the base path
    fn find_route_for_uri(&self, uri: &str) -> AdapterResult<Option<RouteNode>>;
}

/// `AutoRouteAdapter` over any `DocumentRepository`
#[derive(Debug)]
pub struct RepositoryAdapter {
    materializer: PathMaterializer,
    comparator: RouteComparator,
}

impl RepositoryAdapter {
    pub fn new(repository: Arc<dyn DocumentRepository>, config: &AdapterConfig) -> AdapterResult<Self> {
        Ok(Self {
            materializer: PathMaterializer::new(repository.clone(), config)?,
            comparator: RouteComparator::new(repository),
        })
    }

    pub fn materializer(&self) -> &PathMaterializer {
        &self.materializer
    }

    pub fn comparator(&self) -> &RouteComparator {
        &self.comparator
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        self.materializer.repository()
    }
}

impl AutoRouteAdapter for RepositoryAdapter {
    fn get_locales(&self, content: &dyn Content) -> AdapterResult<Vec<String>> {
        self.comparator.get_locales(content)
    }

    fn translate_object(&self, content: &dyn Content, locale: &str) -> AdapterResult<Option<ContentItem>> {
        self.comparator.translate_object(content, locale)
    }

    fn generate_auto_route_tag(&self, ctx: &UriContext<'_>) -> String {
        self.comparator.generate_auto_route_tag(ctx)
    }

    fn migrate_auto_route_children(&self, source: &RouteNode, dest: &RouteNode) -> AdapterResult<()> {
        self.materializer.migrate_auto_route_children(source, dest)
    }

    fn remove_auto_route(&self, route: &RouteNode) -> AdapterResult<()> {
        self.materializer.remove_auto_route(route)
    }

    fn create_auto_route(&self, ctx: &mut UriContext<'_>, locale: Option<&str>) -> AdapterResult<RouteNode> {
        self.materializer.create_auto_route(ctx, locale)
    }

    fn create_redirect_route(&self, referring: &mut RouteNode, new_route: &RouteNode) {
        self.materializer.create_redirect_route(referring, new_route)
    }

    fn save_route(&self, route: &RouteNode) -> AdapterResult<()> {
        self.materializer.save_route(route)
    }

    fn get_real_class_name(&self, type_name: &str) -> String {
        self.comparator.get_real_class_name(type_name)
    }

    fn compare_auto_route_content(&self, route: &RouteNode, content: &dyn Content) -> bool {
        self.comparator.compare_auto_route_content(route, content)
    }

    fn compare_auto_route_locale(&self, route: &RouteNode, locale: Option<&str>) -> bool {
        self.comparator.compare_auto_route_locale(route, locale)
    }

    fn get_referring_auto_routes(&self, content: &dyn Content) -> AdapterResult<Vec<RouteNode>> {
        self.comparator.get_referring_auto_routes(content)
    }

    fn find_route_for_uri(&self, uri: &str) -> AdapterResult<Option<RouteNode>> {
        self.materializer.find_route_for_uri(uri)
    }
}
