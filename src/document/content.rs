//! Content items and the route-referrer capability

use super::node::{DocumentId, Properties, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of a content item owned by the surrounding CMS
///
/// Serializes as a plain string (e.g. "article:42").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Content that keeps a list of the routes pointing at it
pub trait RouteReferrers {
    /// Record a route referring to this content
    fn add_route(&mut self, route: DocumentId);

    /// Forget a route; the adapter never removes back-references
    fn remove_route(&mut self, route: &DocumentId);

    /// Routes currently recorded, in insertion order
    fn routes(&self) -> &[DocumentId];
}

/// A content item as seen by the adapter
///
/// Identity is the `ContentId`: two values with the same id are the same
/// item, whatever their field values.
pub trait Content {
    fn content_id(&self) -> &ContentId;

    /// Type name as reported by the repository; may carry a proxy marker
    fn type_name(&self) -> &str;

    /// The referrer capability, for content that tracks its routes
    fn route_referrers_mut(&mut self) -> Option<&mut dyn RouteReferrers> {
        None
    }
}

/// Content metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A content document stored on the repository's content side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub type_name: String,
    /// Whether the item has per-locale translations
    #[serde(default)]
    pub translatable: bool,
    /// Locale this instance was loaded in; `None` for the untranslated item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Untranslated field values
    #[serde(default)]
    pub fields: Properties,
    /// Translated field values, by locale
    #[serde(default)]
    pub translations: BTreeMap<String, Properties>,
    /// Routes referring to this item
    #[serde(default)]
    pub routes: Vec<DocumentId>,
    #[serde(default)]
    pub metadata: ContentMetadata,
}

impl ContentItem {
    pub fn new(id: impl Into<ContentId>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            translatable: false,
            locale: None,
            fields: Properties::new(),
            translations: BTreeMap::new(),
            routes: Vec::new(),
            metadata: ContentMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Add a translation; marks the item translatable
    pub fn with_translation(mut self, locale: impl Into<String>, fields: Properties) -> Self {
        self.translatable = true;
        self.translations.insert(locale.into(), fields);
        self
    }

    /// Locales with a stored translation, sorted
    pub fn locales(&self) -> Vec<String> {
        self.translations.keys().cloned().collect()
    }

    /// This item as loaded in `locale`: translated fields over the defaults.
    ///
    /// Returns `None` when no translation exists for `locale`.
    pub fn translated(&self, locale: &str) -> Option<ContentItem> {
        let translation = self.translations.get(locale)?;
        let mut item = self.clone();
        item.locale = Some(locale.to_string());
        item.fields
            .extend(translation.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(item)
    }

    fn touch(&mut self) {
        self.metadata.updated_at = Some(Utc::now());
    }
}

impl RouteReferrers for ContentItem {
    fn add_route(&mut self, route: DocumentId) {
        if !self.routes.contains(&route) {
            self.routes.push(route);
            self.touch();
        }
    }

    fn remove_route(&mut self, route: &DocumentId) {
        self.routes.retain(|r| r != route);
        self.touch();
    }

    fn routes(&self) -> &[DocumentId] {
        &self.routes
    }
}

impl Content for ContentItem {
    fn content_id(&self) -> &ContentId {
        &self.id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn route_referrers_mut(&mut self) -> Option<&mut dyn RouteReferrers> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_route_ignores_duplicates() {
        let mut item = ContentItem::new("article:1", "article");
        let route = DocumentId::new();
        item.add_route(route);
        item.add_route(route);
        assert_eq!(item.routes(), &[route]);

        item.remove_route(&route);
        assert!(item.routes().is_empty());
    }

    #[test]
    fn test_translated_overlays_fields() {
        let mut fr = Properties::new();
        fr.insert("title".to_string(), "Bonjour".into());
        let item = ContentItem::new("article:1", "article")
            .with_field("title", "Hello".into())
            .with_field("slug", "hello".into())
            .with_translation("fr", fr);

        assert!(item.translatable);
        assert_eq!(item.locales(), vec!["fr".to_string()]);

        let translated = item.translated("fr").unwrap();
        assert_eq!(translated.locale.as_deref(), Some("fr"));
        assert_eq!(translated.fields.get("title"), Some(&"Bonjour".into()));
        assert_eq!(translated.fields.get("slug"), Some(&"hello".into()));
        assert_eq!(translated.id, item.id);

        assert!(item.translated("de").is_none());
    }

    #[test]
    fn test_content_item_offers_referrer_capability() {
        let mut item = ContentItem::new("page:home", "page");
        let route = DocumentId::new();
        item.route_referrers_mut().unwrap().add_route(route);
        assert_eq!(item.routes, vec![route]);
    }
}
