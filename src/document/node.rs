//! Tree nodes: placeholders, route nodes and foreign documents

use super::content::ContentId;
use super::path::NodePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Shape of structural nodes that carry no routing semantics
pub const PLACEHOLDER_SHAPE: &str = "generic";

/// Built-in route node shape
pub const AUTO_ROUTE_SHAPE: &str = "auto_route";

/// Unique identifier for a tree node
///
/// Stable across moves: a node keeps its id when its path changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random DocumentId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DocumentId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the hyphenated string form
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Properties collection, ordered by key
pub type Properties = BTreeMap<String, PropertyValue>;

/// Node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// When the node was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the node was last modified
    pub modified_at: Option<DateTime<Utc>>,
}

/// Header shared by every persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Unique identifier
    pub id: DocumentId,
    /// Absolute path in the tree
    pub path: NodePath,
    /// Stored shape name; decides the document kind at load time
    pub shape: String,
    /// Node metadata
    pub metadata: NodeMetadata,
}

impl TreeNode {
    /// Create a new node header at `path` with the given shape
    pub fn new(path: NodePath, shape: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            path,
            shape: shape.into(),
            metadata: NodeMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }

    /// Node name, i.e. the last path segment
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Update the last modified timestamp
    pub fn touch(&mut self) {
        self.metadata.modified_at = Some(Utc::now());
    }
}

/// Whether a route resolves to content or to another route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    /// Route resolves directly to content
    #[default]
    Primary,
    /// Route points to another route node
    Redirect,
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteType::Primary => write!(f, "primary"),
            RouteType::Redirect => write!(f, "redirect"),
        }
    }
}

/// Routing fields stored on a route node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteFields {
    /// Owning content item; `None` until the route is bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentId>,
    /// Locale tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default)]
    pub route_type: RouteType,
    /// Target route; only set for redirects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<DocumentId>,
    /// Extra routing parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: Properties,
}

/// A node carrying route semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteNode {
    pub node: TreeNode,
    pub fields: RouteFields,
}

impl RouteNode {
    pub fn new(node: TreeNode, fields: RouteFields) -> Self {
        Self { node, fields }
    }

    pub fn id(&self) -> &DocumentId {
        &self.node.id
    }

    pub fn path(&self) -> &NodePath {
        &self.node.path
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn content(&self) -> Option<&ContentId> {
        self.fields.content.as_ref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.fields.locale.as_deref()
    }

    pub fn route_type(&self) -> RouteType {
        self.fields.route_type
    }

    pub fn redirect_target(&self) -> Option<&DocumentId> {
        self.fields.redirect_target.as_ref()
    }

    pub fn defaults(&self) -> &Properties {
        &self.fields.defaults
    }

    pub fn set_content(&mut self, content: Option<ContentId>) {
        self.fields.content = content;
        self.node.touch();
    }

    pub fn set_locale(&mut self, locale: Option<String>) {
        self.fields.locale = locale;
        self.node.touch();
    }

    pub fn set_route_type(&mut self, route_type: RouteType) {
        self.fields.route_type = route_type;
        self.node.touch();
    }

    pub fn set_redirect_target(&mut self, target: Option<DocumentId>) {
        self.fields.redirect_target = target;
        self.node.touch();
    }

    pub fn set_default(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.fields.defaults.insert(key.into(), value);
        self.node.touch();
    }
}

/// A node as materialized by the repository
///
/// The variant is fixed when the node is loaded. Changing a node's shape
/// requires rewriting it in storage and loading it again
/// (see `DocumentRepository::convert_shape`).
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Structural node filling an intermediate path segment
    Placeholder(TreeNode),
    /// Route node
    Route(RouteNode),
    /// Any other stored shape
    Foreign(TreeNode),
}

impl Document {
    pub fn node(&self) -> &TreeNode {
        match self {
            Document::Placeholder(node) | Document::Foreign(node) => node,
            Document::Route(route) => &route.node,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.node().id
    }

    pub fn path(&self) -> &NodePath {
        &self.node().path
    }

    pub fn shape(&self) -> &str {
        &self.node().shape
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Document::Placeholder(_))
    }

    pub fn is_route(&self) -> bool {
        matches!(self, Document::Route(_))
    }

    pub fn as_route(&self) -> Option<&RouteNode> {
        match self {
            Document::Route(route) => Some(route),
            _ => None,
        }
    }

    pub fn into_route(self) -> Option<RouteNode> {
        match self {
            Document::Route(route) => Some(route),
            _ => None,
        }
    }

    /// Route fields to store alongside the header, if any
    pub fn route_fields(&self) -> Option<&RouteFields> {
        self.as_route().map(|route| &route.fields)
    }
}

impl From<RouteNode> for Document {
    fn from(route: RouteNode) -> Self {
        Document::Route(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_node_name_follows_path() {
        let node = TreeNode::new(NodePath::new("/cms/routes/blog"), PLACEHOLDER_SHAPE);
        assert_eq!(node.name(), "blog");
        assert!(node.metadata.created_at.is_some());
        assert!(node.metadata.modified_at.is_none());
    }

    #[test]
    fn test_route_setters_touch_node() {
        let node = TreeNode::new(NodePath::new("/routes/a"), AUTO_ROUTE_SHAPE);
        let mut route = RouteNode::new(node, RouteFields::default());
        assert_eq!(route.route_type(), RouteType::Primary);

        route.set_locale(Some("en".to_string()));
        route.set_default("_format", "html".into());

        assert_eq!(route.locale(), Some("en"));
        assert_eq!(
            route.defaults().get("_format"),
            Some(&PropertyValue::String("html".to_string()))
        );
        assert!(route.node.metadata.modified_at.is_some());
    }

    #[test]
    fn test_document_accessors() {
        let placeholder = Document::Placeholder(TreeNode::new(NodePath::new("/a"), PLACEHOLDER_SHAPE));
        assert!(placeholder.is_placeholder());
        assert!(placeholder.as_route().is_none());
        assert_eq!(placeholder.shape(), PLACEHOLDER_SHAPE);

        let route = RouteNode::new(
            TreeNode::new(NodePath::new("/a/b"), AUTO_ROUTE_SHAPE),
            RouteFields::default(),
        );
        let id = *route.id();
        let doc = Document::from(route);
        assert!(doc.is_route());
        assert_eq!(doc.id(), &id);
        assert_eq!(doc.into_route().map(|r| *r.id()), Some(id));
    }

    #[test]
    fn test_document_id_parse_round_trips_display() {
        let id = DocumentId::new();
        assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
        assert!(DocumentId::parse("not-a-uuid").is_err());
    }
}
