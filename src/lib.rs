//! Autoroute: route materialization over a path-addressed document repository
//!
//! A reconciliation engine decides which URIs a content item should be
//! reachable at; this crate turns those URIs into route nodes inside a
//! hierarchical repository and keeps them consistent as content moves.
//!
//! # Core Concepts
//!
//! - **Documents**: nodes addressed by an absolute path, typed by their shape
//!   (placeholder, route or foreign)
//! - **Repository**: a unit-of-work store; writes are staged until `commit`
//! - **Adapter**: `PathMaterializer` builds and reshapes the route tree,
//!   `RouteComparator` answers identity and locale questions
//!
//! # Example
//!
//! ```
//! use autoroute::{AdapterConfig, AutoRouteAdapter, ContentItem, DocumentRepository,
//!     MemoryRepository, NodePath, RepositoryAdapter, UriContext};
//! use std::sync::Arc;
//!
//! let repo = Arc::new(MemoryRepository::new());
//! repo.provision_path(&NodePath::new("/cms/routes")).unwrap();
//! let adapter = RepositoryAdapter::new(repo.clone(), &AdapterConfig::default()).unwrap();
//!
//! let mut page = ContentItem::new("page:about", "page");
//! let mut ctx = UriContext::new(&mut page, "company/about").with_locale("en");
//! let route = adapter.create_auto_route(&mut ctx, Some("en")).unwrap();
//! repo.commit().unwrap();
//!
//! assert_eq!(route.path().as_str(), "/cms/routes/company/about");
//! ```

pub mod adapter;
pub mod config;
pub mod document;
pub mod repository;

pub use adapter::{
    AdapterError, AdapterResult, AutoRouteAdapter, PathMaterializer, RepositoryAdapter,
    RouteComparator, UriContext,
};
pub use config::{AdapterConfig, ConfigError};
pub use document::{
    Content, ContentId, ContentItem, Document, DocumentId, NodePath, PropertyValue, RouteNode,
    RouteReferrers, RouteType, TreeNode,
};
pub use repository::{
    DocumentRepository, MemoryRepository, OpenRepository, ShapeFilter, ShapeRegistry,
    SqliteRepository, StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
