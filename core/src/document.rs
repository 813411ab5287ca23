//! JSON:API wire model.
//!
//! # Design
//! Only the members this crate reads or writes are modeled. Primary data and
//! relationship linkage are untagged enums so `null`, a single object and an
//! array all deserialize without a discriminator.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::Id;

/// A top-level JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

impl Document {
    pub fn single(resource: ResourceObject) -> Self {
        Self { data: PrimaryData::One(Box::new(resource)), ..Default::default() }
    }
}

/// The `data` member of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Box<ResourceObject>),
    #[default]
    Null,
}

/// One resource in JSON:API form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    /// Absent on create requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// A relationship member of a resource object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// `None` when the member is absent (a links-only relationship);
    /// `Some(Linkage::Null)` for an explicit `"data": null`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Linkage>, D::Error> {
    Linkage::deserialize(deserializer).map(Some)
}

/// Resource linkage: to-one, to-many, or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
    #[default]
    Null,
}

/// `{type, id}` reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_compound_document() {
        let doc: Document = serde_json::from_value(json!({
            "data": [{
                "id": "1",
                "type": "posts",
                "attributes": {"title": "Hello"},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "tags": {"data": [{"type": "tags", "id": 2}]},
                    "editor": {"data": null},
                }
            }],
            "included": [{"id": "9", "type": "people", "attributes": {"name": "Ada"}}],
            "meta": {"total": 1}
        }))
        .unwrap();

        let PrimaryData::Many(resources) = &doc.data else {
            panic!("expected a collection");
        };
        let post = &resources[0];
        assert_eq!(post.id, Some(Id::from("1")));
        assert!(matches!(post.relationships["author"].data, Some(Linkage::One(_))));
        assert!(matches!(&post.relationships["tags"].data, Some(Linkage::Many(ids)) if ids[0].id == Id::from("2")));
        assert_eq!(post.relationships["editor"].data, Some(Linkage::Null));
        assert_eq!(doc.included.len(), 1);
    }

    #[test]
    fn links_only_relationship_has_no_data() {
        let resource: ResourceObject = serde_json::from_value(json!({
            "id": "1",
            "type": "posts",
            "relationships": {"comments": {"links": {"related": "/posts/1/comments"}}}
        }))
        .unwrap();
        assert_eq!(resource.relationships["comments"].data, None);
        assert_eq!(
            serde_json::to_value(&resource.relationships["comments"]).unwrap(),
            json!({"links": {"related": "/posts/1/comments"}})
        );
    }

    #[test]
    fn null_and_missing_data_are_null() {
        let doc: Document = serde_json::from_value(json!({"data": null})).unwrap();
        assert_eq!(doc.data, PrimaryData::Null);
        let doc: Document = serde_json::from_value(json!({"meta": {}})).unwrap();
        assert_eq!(doc.data, PrimaryData::Null);
    }

    #[test]
    fn create_document_omits_id() {
        let doc = Document::single(ResourceObject {
            type_name: "posts".into(),
            attributes: json!({"title": "x"}).as_object().cloned().unwrap(),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(doc).unwrap(),
            json!({"data": {"type": "posts", "attributes": {"title": "x"}}})
        );
    }
}
