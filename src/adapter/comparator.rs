//! RouteComparator: identity and locale checks for reconciliation

use super::context::UriContext;
use super::error::AdapterResult;
use crate::document::{Content, ContentItem, Document, RouteNode};
use crate::repository::{DocumentRepository, ShapeFilter};
use std::sync::Arc;

/// Locale tag stored on routes of content without a multilingual variant
pub const TAG_NO_MULTILANG: &str = "no-multilang";

/// Marker the repository puts in the type names of lazy-loading proxies
pub const PROXY_MARKER: &str = "__CG__";

/// Predicates and lookups the reconciliation engine uses to decide whether
/// an existing route is still valid
pub struct RouteComparator {
    repository: Arc<dyn DocumentRepository>,
}

impl RouteComparator {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }

    /// The locale tag for a request: its locale, or `TAG_NO_MULTILANG`
    pub fn generate_auto_route_tag(&self, ctx: &UriContext<'_>) -> String {
        auto_route_tag(ctx.locale())
    }

    /// True iff the route points at this very content item
    pub fn compare_auto_route_content(&self, route: &RouteNode, content: &dyn Content) -> bool {
        route.content() == Some(content.content_id())
    }

    /// True iff the route's locale equals `locale`, with the no-multilang
    /// tag and `""` on either side read as "no locale"
    pub fn compare_auto_route_locale(&self, route: &RouteNode, locale: Option<&str>) -> bool {
        let route_locale = match route.locale() {
            Some(TAG_NO_MULTILANG) | Some("") => None,
            other => other,
        };
        let locale = locale.filter(|l| !l.is_empty());
        route_locale == locale
    }

    /// Resolve a proxy type name to the name of the type it stands for
    pub fn get_real_class_name(&self, type_name: &str) -> String {
        real_type_name(type_name).to_string()
    }

    /// Locales the content is translated into; empty if it is not translatable
    pub fn get_locales(&self, content: &dyn Content) -> AdapterResult<Vec<String>> {
        if self.repository.is_translatable(content)? {
            return Ok(self.repository.locales_for(content)?);
        }
        Ok(Vec::new())
    }

    /// Load the content in another locale
    pub fn translate_object(
        &self,
        content: &dyn Content,
        locale: &str,
    ) -> AdapterResult<Option<ContentItem>> {
        let type_name = real_type_name(content.type_name());
        Ok(self
            .repository
            .find_translation(type_name, content.content_id(), locale)?)
    }

    /// Every route node whose content reference is this item
    pub fn get_referring_auto_routes(&self, content: &dyn Content) -> AdapterResult<Vec<RouteNode>> {
        Ok(self
            .repository
            .find_referrers(content.content_id(), &ShapeFilter::Routes)?
            .into_iter()
            .filter_map(Document::into_route)
            .collect())
    }
}

impl std::fmt::Debug for RouteComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteComparator").finish_non_exhaustive()
    }
}

/// The locale tag for an optional locale; `None` and `""` map to
/// `TAG_NO_MULTILANG`
pub fn auto_route_tag(locale: Option<&str>) -> String {
    match locale {
        Some(locale) if !locale.is_empty() => locale.to_string(),
        _ => TAG_NO_MULTILANG.to_string(),
    }
}

/// Strip a proxy marker: `"__CG__\\Blog\\Post"` becomes `"Blog\\Post"`
pub fn real_type_name(type_name: &str) -> &str {
    match type_name.rfind(PROXY_MARKER) {
        Some(idx) => type_name[idx + PROXY_MARKER.len()..]
            .trim_start_matches(|c: char| matches!(c, '\\' | ':' | '.')),
        None => type_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        ContentId, NodePath, Properties, RouteFields, TreeNode, AUTO_ROUTE_SHAPE,
    };
    use crate::repository::MemoryRepository;

    fn comparator() -> (Arc<MemoryRepository>, RouteComparator) {
        let repo = Arc::new(MemoryRepository::new());
        (repo.clone(), RouteComparator::new(repo))
    }

    fn route_with(content: Option<&str>, locale: Option<&str>) -> RouteNode {
        RouteNode::new(
            TreeNode::new(NodePath::new("/routes/x"), AUTO_ROUTE_SHAPE),
            RouteFields {
                content: content.map(ContentId::new),
                locale: locale.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_tag_uses_locale_or_sentinel() {
        let (_, comparator) = comparator();
        let mut item = ContentItem::new("page:1", "page");

        let ctx = UriContext::new(&mut item, "a").with_locale("fr");
        assert_eq!(comparator.generate_auto_route_tag(&ctx), "fr");

        let ctx = UriContext::new(&mut item, "a");
        assert_eq!(comparator.generate_auto_route_tag(&ctx), TAG_NO_MULTILANG);

        let ctx = UriContext::new(&mut item, "a").with_locale("");
        assert_eq!(comparator.generate_auto_route_tag(&ctx), TAG_NO_MULTILANG);
    }

    #[test]
    fn test_content_comparison_is_by_identity() {
        let (_, comparator) = comparator();
        let route = route_with(Some("page:1"), None);

        // same id, different field values: still the same item
        let same = ContentItem::new("page:1", "page").with_field("title", "changed".into());
        let other = ContentItem::new("page:2", "page");

        assert!(comparator.compare_auto_route_content(&route, &same));
        assert!(!comparator.compare_auto_route_content(&route, &other));
        assert!(!comparator.compare_auto_route_content(&route_with(None, None), &same));
    }

    #[test]
    fn test_locale_comparison_normalizes_sentinel() {
        let (_, comparator) = comparator();

        assert!(comparator.compare_auto_route_locale(&route_with(None, Some(TAG_NO_MULTILANG)), None));
        assert!(comparator.compare_auto_route_locale(&route_with(None, None), None));
        assert!(comparator.compare_auto_route_locale(&route_with(None, Some("")), None));
        assert!(!comparator.compare_auto_route_locale(&route_with(None, Some("en")), None));

        assert!(comparator.compare_auto_route_locale(&route_with(None, Some("en")), Some("en")));
        assert!(!comparator.compare_auto_route_locale(&route_with(None, Some("en")), Some("de")));
        assert!(!comparator.compare_auto_route_locale(
            &route_with(None, Some(TAG_NO_MULTILANG)),
            Some("en")
        ));
    }

    #[test]
    fn test_locale_comparison_treats_empty_locale_as_none() {
        let (_, comparator) = comparator();

        assert!(comparator.compare_auto_route_locale(&route_with(None, Some("")), Some("")));
        assert!(comparator.compare_auto_route_locale(&route_with(None, None), Some("")));
        assert!(comparator.compare_auto_route_locale(
            &route_with(None, Some(TAG_NO_MULTILANG)),
            Some("")
        ));
        assert!(!comparator.compare_auto_route_locale(&route_with(None, Some("en")), Some("")));
    }

    #[test]
    fn test_real_type_name() {
        assert_eq!(real_type_name("__CG__\\Blog\\Post"), "Blog\\Post");
        assert_eq!(real_type_name("Proxies\\__CG__\\Blog\\Post"), "Blog\\Post");
        assert_eq!(real_type_name("__CG__:article"), "article");
        assert_eq!(real_type_name("article"), "article");
    }

    #[test]
    fn test_locales_empty_for_untranslatable_content() {
        let (repo, comparator) = comparator();
        let plain = ContentItem::new("page:1", "page");
        repo.save_content(&plain).unwrap();
        assert!(comparator.get_locales(&plain).unwrap().is_empty());

        // unknown content is treated as untranslatable
        let unknown = ContentItem::new("page:unknown", "page");
        assert!(comparator.get_locales(&unknown).unwrap().is_empty());
    }

    #[test]
    fn test_translate_object_resolves_proxy_type() {
        let (repo, comparator) = comparator();
        let mut de = Properties::new();
        de.insert("title".to_string(), "Hallo".into());
        let item = ContentItem::new("page:1", "page").with_translation("de", de);
        repo.save_content(&item).unwrap();

        let mut proxy = item.clone();
        proxy.type_name = "__CG__:page".to_string();

        let translated = comparator.translate_object(&proxy, "de").unwrap().unwrap();
        assert_eq!(translated.locale.as_deref(), Some("de"));
        assert!(comparator.translate_object(&proxy, "fr").unwrap().is_none());
        assert_eq!(comparator.get_locales(&item).unwrap(), vec!["de".to_string()]);
    }
}
