//! Document model: tree nodes, route nodes and content items

mod content;
mod node;
mod path;

#[cfg(test)]
mod tests;

pub use content::{Content, ContentId, ContentItem, ContentMetadata, RouteReferrers};
pub use node::{
    Document, DocumentId, NodeMetadata, Properties, PropertyValue, RouteFields, RouteNode,
    RouteType, TreeNode, AUTO_ROUTE_SHAPE, PLACEHOLDER_SHAPE,
};
pub use path::{split_segments, NodePath, SEPARATOR};
