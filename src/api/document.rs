use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// A JSON:API document with a single primary resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub data: Resource,
    #[serde(default)]
    pub included: Vec<Resource>,
}

/// A JSON:API document whose primary data is a resource collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDocument {
    pub data: Vec<Resource>,
    #[serde(default)]
    pub included: Vec<Resource>,
}

/// A raw JSON:API resource object.
///
/// Flarum sends ids as strings and attribute names in camelCase;
/// accessors below do the string-to-integer conversion and type
/// coercion so the store's materializers stay flat.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

/// Relationship linkage: JSON:API allows a single identifier or an
/// array of them depending on cardinality.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Resource {
    /// Numeric id. Flarum serializes ids as decimal strings.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_u64(),
            // Some serializers stringify counters
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(Value::as_bool)
    }

    /// The to-one relationship target id under `name`, if linked.
    pub fn rel_one(&self, name: &str) -> Option<&ResourceIdentifier> {
        match self.relationships.get(name)?.data.as_ref()? {
            RelationshipData::One(ident) => Some(ident),
            RelationshipData::Many(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_resource() -> Resource {
        serde_json::from_value(serde_json::json!({
            "type": "posts",
            "id": "38",
            "attributes": {
                "number": 4,
                "contentType": "comment",
                "contentHtml": "<p>hi</p>"
            },
            "relationships": {
                "user": { "data": { "type": "users", "id": "2" } }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(post_resource().numeric_id(), Some(38));
    }

    #[test]
    fn test_attr_accessors() {
        let r = post_resource();
        assert_eq!(r.attr_u64("number"), Some(4));
        assert_eq!(r.attr_str("contentType"), Some("comment"));
        assert_eq!(r.attr_str("missing"), None);
        assert_eq!(r.attr_u64("contentType"), None);
    }

    #[test]
    fn test_rel_one() {
        let r = post_resource();
        let user = r.rel_one("user").unwrap();
        assert_eq!(user.kind, "users");
        assert_eq!(user.id, "2");
        assert!(r.rel_one("discussion").is_none());
    }

    #[test]
    fn test_stringified_counter_coerces() {
        let r: Resource = serde_json::from_value(serde_json::json!({
            "type": "discussions",
            "id": "1",
            "attributes": { "commentCount": "17" }
        }))
        .unwrap();
        assert_eq!(r.attr_u64("commentCount"), Some(17));
    }

    #[test]
    fn test_many_relationship_parses() {
        let r: Resource = serde_json::from_value(serde_json::json!({
            "type": "discussions",
            "id": "1",
            "relationships": {
                "posts": { "data": [
                    { "type": "posts", "id": "1" },
                    { "type": "posts", "id": "2" }
                ]}
            }
        }))
        .unwrap();
        // to-many linkage is not a to-one
        assert!(r.rel_one("posts").is_none());
    }

    #[test]
    fn test_document_with_included() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "data": { "type": "discussions", "id": "5", "attributes": { "title": "Hello" } },
            "included": [
                { "type": "posts", "id": "1", "attributes": { "number": 1 } }
            ]
        }))
        .unwrap();
        assert_eq!(doc.data.attr_str("title"), Some("Hello"));
        assert_eq!(doc.included.len(), 1);
    }
}
