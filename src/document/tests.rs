//! Serialization tests with stored-row fixtures

use serde_json::{json, Value};

/// Route fields as written to the `route_json` column
fn stored_route_fixture() -> Value {
    json!({
        "content": "article:42",
        "locale": "en",
        "route_type": "primary",
        "defaults": {
            "_format": "html",
            "page": 1
        }
    })
}

/// Redirect route fields, with the redirect target and no defaults
fn stored_redirect_fixture() -> Value {
    json!({
        "content": "article:42",
        "locale": "no-multilang",
        "route_type": "redirect",
        "redirect_target": "6a1f3c9e-8a7b-4c2d-9e0f-1a2b3c4d5e6f"
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::document::{
        ContentId, ContentItem, DocumentId, NodePath, PropertyValue, RouteFields, RouteType,
    };

    #[test]
    fn content_id_serializes_as_string() {
        let id = ContentId::new("article:42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"article:42\"");
    }

    #[test]
    fn node_path_serializes_as_string() {
        let path = NodePath::new("/cms/routes/blog");
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("/cms/routes/blog"));
    }

    #[test]
    fn route_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RouteType::Primary).unwrap(), "\"primary\"");
        assert_eq!(serde_json::to_string(&RouteType::Redirect).unwrap(), "\"redirect\"");
    }

    #[test]
    fn empty_route_fields_serialize_minimal() {
        let json = serde_json::to_value(RouteFields::default()).unwrap();
        assert_eq!(json, json!({ "route_type": "primary" }));
    }

    #[test]
    fn can_deserialize_stored_route_fixture() {
        let fields: RouteFields = serde_json::from_value(stored_route_fixture()).unwrap();

        assert_eq!(fields.content, Some(ContentId::new("article:42")));
        assert_eq!(fields.locale.as_deref(), Some("en"));
        assert_eq!(fields.route_type, RouteType::Primary);
        assert!(fields.redirect_target.is_none());
        assert_eq!(fields.defaults.get("page"), Some(&PropertyValue::Int(1)));
        assert_eq!(
            fields.defaults.get("_format"),
            Some(&PropertyValue::String("html".to_string()))
        );
    }

    #[test]
    fn can_deserialize_stored_redirect_fixture() {
        let fields: RouteFields = serde_json::from_value(stored_redirect_fixture()).unwrap();

        assert_eq!(fields.route_type, RouteType::Redirect);
        assert_eq!(
            fields.redirect_target,
            Some(DocumentId::parse("6a1f3c9e-8a7b-4c2d-9e0f-1a2b3c4d5e6f").unwrap())
        );
        assert!(fields.defaults.is_empty());
    }

    #[test]
    fn route_type_defaults_to_primary_when_missing() {
        let fields: RouteFields = serde_json::from_value(json!({ "content": "page:1" })).unwrap();
        assert_eq!(fields.route_type, RouteType::Primary);
    }

    #[test]
    fn content_item_tolerates_sparse_rows() {
        let item: ContentItem =
            serde_json::from_value(json!({ "id": "page:home", "type_name": "page" })).unwrap();

        assert_eq!(item.id.as_str(), "page:home");
        assert!(!item.translatable);
        assert!(item.routes.is_empty());
        assert!(item.translations.is_empty());
    }
}
