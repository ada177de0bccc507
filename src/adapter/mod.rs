//! Route adapter layer
//!
//! Bridges the reconciliation engine and a `DocumentRepository`:
//! `PathMaterializer` builds and reshapes the route tree, `RouteComparator`
//! answers identity and locale questions, and `RepositoryAdapter` exposes
//! both through the `AutoRouteAdapter` contract.

mod comparator;
mod context;
mod error;
mod materializer;
mod traits;

pub use comparator::{auto_route_tag, real_type_name, RouteComparator, PROXY_MARKER, TAG_NO_MULTILANG};
pub use context::UriContext;
pub use error::{AdapterError, AdapterResult};
pub use materializer::PathMaterializer;
pub use traits::{AutoRouteAdapter, RepositoryAdapter};
