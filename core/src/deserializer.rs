//! Response documents to flattened records.
//!
//! # Design
//! `Unwrapper` indexes `included` by `(type, id)` once per document and then
//! flattens resource objects on demand. Relationship values go through the
//! resource's [`RelationshipMapping`](crate::settings::RelationshipMapping),
//! which by default yields the flattened included record or `{id}`. A
//! resource already being flattened higher up the same path is not expanded
//! again, so cyclic `included` graphs terminate.

use std::collections::HashMap;

use serde_json::Value;

use crate::document::{Document, Linkage, PrimaryData, ResourceIdentifier, ResourceObject};
use crate::error::{ApiError, Result};
use crate::settings::{DeserializerOptions, Settings};
use crate::types::Record;

type ResourceKey<'a> = (&'a str, &'a str);

pub struct Unwrapper<'a> {
    options: &'a DeserializerOptions,
    included: HashMap<ResourceKey<'a>, &'a ResourceObject>,
}

impl<'a> Unwrapper<'a> {
    pub fn new(document: &'a Document, options: &'a DeserializerOptions) -> Self {
        let included = document
            .included
            .iter()
            .filter_map(|r| r.id.as_ref().map(|id| ((r.type_name.as_str(), id.as_str()), r)))
            .collect();
        Self { options, included }
    }

    /// Flatten one resource object into `{id, ...attributes, ...relationships}`.
    pub fn unwrap(&self, resource: &'a ResourceObject) -> Result<Record> {
        self.flatten(resource, &mut Vec::new())
    }

    fn flatten(&self, resource: &'a ResourceObject, path: &mut Vec<ResourceKey<'a>>) -> Result<Record> {
        let id = resource.id.as_ref().ok_or_else(|| {
            ApiError::Deserialization(format!(
                "resource object of type \"{}\" has no id",
                resource.type_name
            ))
        })?;
        let case = self.options.key_for_attribute;

        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id.to_string()));
        if self.options.type_as_attribute {
            record.insert("type".to_string(), Value::String(resource.type_name.clone()));
        }
        for (key, value) in &resource.attributes {
            record.insert(case.apply(key), value.clone());
        }

        path.push((resource.type_name.as_str(), id.as_str()));
        for (name, relationship) in &resource.relationships {
            // links-only relationships say nothing about the related data
            let Some(data) = &relationship.data else {
                continue;
            };
            let value = match data {
                Linkage::Null => Value::Null,
                Linkage::One(identifier) => self.relationship_value(name, identifier, path)?,
                Linkage::Many(identifiers) => Value::Array(
                    identifiers
                        .iter()
                        .map(|identifier| self.relationship_value(name, identifier, path))
                        .collect::<Result<_>>()?,
                ),
            };
            record.insert(case.apply(name), value);
        }
        path.pop();

        if let Some(links) = &resource.links {
            record.insert("links".to_string(), links.clone());
        }
        Ok(record)
    }

    fn relationship_value(
        &self,
        name: &str,
        identifier: &'a ResourceIdentifier,
        path: &mut Vec<ResourceKey<'a>>,
    ) -> Result<Value> {
        let key = (identifier.type_name.as_str(), identifier.id.as_str());
        let included = match self.included.get(&key) {
            Some(&resource) if !path.contains(&key) => Some(self.flatten(resource, path)?),
            _ => None,
        };
        Ok(self.options.relationship(name).value_for(&identifier.id, included))
    }
}

/// Parse a response body as a JSON:API document.
pub fn parse_document(body: &str) -> Result<Document> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn collection(document: &Document) -> Result<&[ResourceObject]> {
    match &document.data {
        PrimaryData::Many(resources) => Ok(resources),
        _ => Err(ApiError::Deserialization(
            "expected an array of resource objects in \"data\"".to_string(),
        )),
    }
}

/// Total record count for a list-shaped response.
///
/// With no total field configured the returned records are counted;
/// otherwise the meta field must exist.
pub fn extract_total(document: &Document, settings: &Settings) -> Result<u64> {
    let Some(field) = settings.total.as_deref() else {
        return Ok(collection(document)?.len() as u64);
    };
    let value = document
        .meta
        .as_ref()
        .and_then(|meta| meta.get(field))
        .ok_or_else(|| ApiError::MissingTotalMeta { field: field.to_string() })?;
    value.as_u64().ok_or_else(|| ApiError::InvalidTotal {
        field: field.to_string(),
        value: value.clone(),
    })
}

/// Flatten every resource of a collection document.
pub fn unwrap_collection(document: &Document, options: &DeserializerOptions) -> Result<Vec<Record>> {
    let unwrapper = Unwrapper::new(document, options);
    collection(document)?
        .iter()
        .map(|resource| unwrapper.unwrap(resource))
        .collect()
}

/// Flatten the single primary resource of a document.
pub fn unwrap_single(document: &Document, options: &DeserializerOptions) -> Result<Record> {
    match &document.data {
        PrimaryData::One(resource) => Unwrapper::new(document, options).unwrap(resource),
        PrimaryData::Many(_) => Err(ApiError::Deserialization(
            "expected a single resource object in \"data\"".to_string(),
        )),
        PrimaryData::Null => Err(ApiError::Deserialization("document has no primary data".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::KeyCase;
    use crate::settings::RelationshipMapping;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn settings_with_total(total: Option<&str>) -> Settings {
        Settings { total: total.map(str::to_string), ..Settings::default() }
    }

    #[test]
    fn null_total_counts_data_even_with_meta() {
        let d = doc(json!({
            "data": [{"id": "1", "type": "posts"}, {"id": "2", "type": "posts"}],
            "meta": {"total": 99}
        }));
        assert_eq!(extract_total(&d, &settings_with_total(None)).unwrap(), 2);
    }

    #[test]
    fn meta_total_wins_over_length() {
        let d = doc(json!({"data": [{"id": "1", "type": "posts"}], "meta": {"total": 42}}));
        assert_eq!(extract_total(&d, &settings_with_total(Some("total"))).unwrap(), 42);
    }

    #[test]
    fn missing_meta_is_a_hard_error() {
        let d = doc(json!({"data": [{"id": "1", "type": "posts"}]}));
        let err = extract_total(&d, &settings_with_total(Some("total"))).unwrap_err();
        assert!(matches!(err, ApiError::MissingTotalMeta { ref field } if field == "total"));

        let d = doc(json!({"data": [], "meta": {"count": 3}}));
        let err = extract_total(&d, &settings_with_total(Some("total"))).unwrap_err();
        assert!(matches!(err, ApiError::MissingTotalMeta { .. }));
    }

    #[test]
    fn custom_total_field_and_bad_values() {
        let d = doc(json!({"data": [], "meta": {"count": 3}}));
        assert_eq!(extract_total(&d, &settings_with_total(Some("count"))).unwrap(), 3);

        let d = doc(json!({"data": [], "meta": {"total": "many"}}));
        let err = extract_total(&d, &settings_with_total(Some("total"))).unwrap_err();
        assert!(matches!(err, ApiError::InvalidTotal { .. }));
    }

    #[test]
    fn relationship_without_included_is_reference() {
        let d = doc(json!({
            "data": {
                "id": "1", "type": "posts",
                "attributes": {"title": "Hi"},
                "relationships": {"author": {"data": {"type": "people", "id": "9"}}}
            }
        }));
        let record = unwrap_single(&d, &DeserializerOptions::default()).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"id": "1", "title": "Hi", "author": {"id": "9"}})
        );
    }

    #[test]
    fn included_relationships_are_flattened_recursively() {
        let d = doc(json!({
            "data": [{
                "id": "1", "type": "posts",
                "attributes": {"title": "Hi"},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "tags": {"data": [{"type": "tags", "id": "a"}, {"type": "tags", "id": "b"}]},
                    "editor": {"data": null}
                }
            }],
            "included": [
                {"id": "9", "type": "people", "attributes": {"name": "Ada"},
                 "relationships": {"employer": {"data": {"type": "orgs", "id": "o1"}}}},
                {"id": "o1", "type": "orgs", "attributes": {"name": "ACME"}},
                {"id": "a", "type": "tags", "attributes": {"label": "rust"}}
            ]
        }));
        let records = unwrap_collection(&d, &DeserializerOptions::default()).unwrap();
        assert_eq!(
            Value::Object(records[0].clone()),
            json!({
                "id": "1",
                "title": "Hi",
                "author": {"id": "9", "name": "Ada", "employer": {"id": "o1", "name": "ACME"}},
                "tags": [{"id": "a", "label": "rust"}, {"id": "b"}],
                "editor": null
            })
        );
    }

    #[test]
    fn links_only_relationships_are_left_out() {
        let d = doc(json!({
            "data": {
                "id": "1", "type": "posts",
                "attributes": {"title": "Hi"},
                "relationships": {
                    "comments": {"links": {"related": "/posts/1/comments"}},
                    "editor": {"data": null}
                }
            }
        }));
        let record = unwrap_single(&d, &DeserializerOptions::default()).unwrap();
        assert_eq!(Value::Object(record), json!({"id": "1", "title": "Hi", "editor": null}));
    }

    #[test]
    fn cycles_terminate() {
        let d = doc(json!({
            "data": {
                "id": "1", "type": "people",
                "relationships": {"friend": {"data": {"type": "people", "id": "2"}}}
            },
            "included": [
                {"id": "2", "type": "people",
                 "relationships": {"friend": {"data": {"type": "people", "id": "1"}}}},
                {"id": "1", "type": "people",
                 "relationships": {"friend": {"data": {"type": "people", "id": "2"}}}}
            ]
        }));
        let record = unwrap_single(&d, &DeserializerOptions::default()).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"id": "1", "friend": {"id": "2", "friend": {"id": "1"}}})
        );
    }

    #[test]
    fn options_shape_the_record() {
        let d = doc(json!({
            "data": {
                "id": "1", "type": "posts",
                "attributes": {"created_at": "today"},
                "relationships": {"main_author": {"data": {"type": "people", "id": "9"}}},
                "links": {"self": "/posts/1"}
            }
        }));
        let options = DeserializerOptions {
            key_for_attribute: KeyCase::CamelCase,
            type_as_attribute: true,
            relationships: [("main_author".to_string(), RelationshipMapping::Identifier)].into(),
        };
        let record = unwrap_single(&d, &options).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({
                "id": "1",
                "type": "posts",
                "createdAt": "today",
                "mainAuthor": "9",
                "links": {"self": "/posts/1"}
            })
        );
    }

    #[test]
    fn shape_mismatches_are_deserialization_errors() {
        let single = doc(json!({"data": {"id": "1", "type": "posts"}}));
        assert!(matches!(
            unwrap_collection(&single, &DeserializerOptions::default()),
            Err(ApiError::Deserialization(_))
        ));
        let empty = doc(json!({"data": null}));
        assert!(matches!(
            unwrap_single(&empty, &DeserializerOptions::default()),
            Err(ApiError::Deserialization(_))
        ));
        let no_id = doc(json!({"data": {"type": "posts"}}));
        assert!(matches!(
            unwrap_single(&no_id, &DeserializerOptions::default()),
            Err(ApiError::Deserialization(_))
        ));
        assert!(matches!(parse_document("nope"), Err(ApiError::Deserialization(_))));
    }
}
