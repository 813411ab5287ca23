//! Request documents for create and update.
//!
//! # Design
//! Record keys become attributes unless they are relationships. A key is a
//! relationship when the resource's options configure it, or when its value
//! is reference-shaped (`{id, ...}` or an array of those) and the key is not
//! listed in `plainAttributes`. Reference values that carry more than an id
//! are written to `included`, so the server receives the related data in
//! place.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::document::{Document, Linkage, PrimaryData, Relationship, ResourceIdentifier, ResourceObject};
use crate::error::{ApiError, Result};
use crate::settings::{RelationshipRef, SerializerOptions};
use crate::types::{Id, Record};

/// Keys never written as attributes: `id` and `type` live at the top of the
/// resource and `links` is left over from a previously deserialized record.
const RESERVED_KEYS: [&str; 3] = ["id", "type", "links"];

/// Build `{data: {type, id?, attributes, relationships?}, included?}`.
pub fn build_document(
    resource: &str,
    id: Option<&Id>,
    record: &Record,
    options: &SerializerOptions,
) -> Result<Document> {
    let mut data = ResourceObject {
        id: id.cloned(),
        type_name: resource.to_string(),
        ..Default::default()
    };
    let mut included = Vec::new();

    for key in selected_keys(record, options) {
        let Some(value) = record.get(key) else {
            continue;
        };
        let wire_key = options.key_for_attribute.apply(key);
        match relationship_rule(key, value, options) {
            Some(rule) => {
                let linkage = linkage(key, value, rule.type_name.as_deref(), rule.included, options, &mut included)?;
                data.relationships
                    .insert(wire_key, Relationship { data: Some(linkage), ..Default::default() });
            }
            None => {
                data.attributes.insert(wire_key, value.clone());
            }
        }
    }

    Ok(Document {
        data: PrimaryData::One(Box::new(data)),
        included,
        ..Default::default()
    })
}

fn selected_keys<'r>(record: &'r Record, options: &'r SerializerOptions) -> Vec<&'r str> {
    match &options.attributes {
        Some(allowed) => allowed
            .iter()
            .map(String::as_str)
            .filter(|key| *key != "id" && *key != "type")
            .collect(),
        None => record
            .keys()
            .map(String::as_str)
            .filter(|key| !RESERVED_KEYS.contains(key))
            .collect(),
    }
}

fn relationship_rule<'o>(
    key: &str,
    value: &Value,
    options: &'o SerializerOptions,
) -> Option<Cow<'o, RelationshipRef>> {
    if let Some(rule) = options.relationships.get(key) {
        return Some(Cow::Borrowed(rule));
    }
    if options.plain_attributes.iter().any(|k| k == key) {
        return None;
    }
    is_reference_shaped(value).then(|| Cow::Owned(RelationshipRef::default()))
}

fn is_reference(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("id"))
        .is_some_and(|id| id.is_string() || id.is_number())
}

fn is_reference_shaped(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(is_reference),
        other => is_reference(other),
    }
}

/// `configured` wins over a `type` carried by the value, which wins over the
/// relationship key.
fn linkage(
    key: &str,
    value: &Value,
    configured: Option<&str>,
    include: bool,
    options: &SerializerOptions,
    included: &mut Vec<ResourceObject>,
) -> Result<Linkage> {
    match value {
        Value::Null => Ok(Linkage::Null),
        Value::Array(items) => items
            .iter()
            .map(|item| identifier(key, item, configured, include, options, included))
            .collect::<Result<Vec<_>>>()
            .map(Linkage::Many),
        single => identifier(key, single, configured, include, options, included).map(Linkage::One),
    }
}

fn identifier(
    key: &str,
    value: &Value,
    configured: Option<&str>,
    include: bool,
    options: &SerializerOptions,
    included: &mut Vec<ResourceObject>,
) -> Result<ResourceIdentifier> {
    let carried = value.get("type").and_then(Value::as_str);
    let type_name = configured.or(carried).unwrap_or(key);
    let id = match value {
        Value::Object(obj) => {
            let raw = obj.get("id").ok_or_else(|| {
                ApiError::Serialization(format!("relationship \"{key}\" references a value without an id"))
            })?;
            let id = Id::try_from(raw)
                .map_err(|e| ApiError::Serialization(format!("relationship \"{key}\": {e}")))?;
            if include && obj.keys().any(|k| !RESERVED_KEYS.contains(&k.as_str())) {
                push_included(type_name, &id, obj, options, included)?;
            }
            id
        }
        scalar => Id::try_from(scalar)
            .map_err(|e| ApiError::Serialization(format!("relationship \"{key}\": {e}")))?,
    };
    Ok(ResourceIdentifier { type_name: type_name.to_string(), id })
}

fn push_included(
    type_name: &str,
    id: &Id,
    obj: &Map<String, Value>,
    options: &SerializerOptions,
    included: &mut Vec<ResourceObject>,
) -> Result<()> {
    let seen = included
        .iter()
        .any(|r| r.type_name == type_name && r.id.as_ref() == Some(id));
    if seen {
        return Ok(());
    }
    let mut resource = ResourceObject {
        id: Some(id.clone()),
        type_name: type_name.to_string(),
        ..Default::default()
    };
    for (key, value) in obj.iter().filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str())) {
        let wire_key = options.key_for_attribute.apply(key);
        if !options.plain_attributes.iter().any(|k| k == key) && is_reference_shaped(value) {
            // Nested references become linkage only; they are not included again.
            let linkage = linkage(key, value, None, false, options, &mut Vec::new())?;
            resource
                .relationships
                .insert(wire_key, Relationship { data: Some(linkage), ..Default::default() });
        } else {
            resource.attributes.insert(wire_key, value.clone());
        }
    }
    included.push(resource);
    Ok(())
}
