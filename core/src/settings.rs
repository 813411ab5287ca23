//! Client settings and their resolution from user overrides.
//!
//! # Design
//! Settings are resolved once per client: the user's JSON is deep-merged over
//! the defaults and then deserialized, so partial overrides such as
//! `{"deserializerOpts": {"posts": {...}}}` keep every other default. The
//! merged value is read-only afterwards.
//!
//! Relationship handling is an explicit lookup. Any relationship without a
//! configured mapping falls back to [`RelationshipMapping::IncludedOrReference`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::case::KeyCase;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;
use crate::types::{Id, Record};

/// Media type sent in `Accept` and `Content-Type`.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json; charset=utf-8";

/// How arrays are written into the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `key[0]=a&key[1]=b`
    Indices,
    /// `key[]=a&key[]=b`
    #[default]
    Brackets,
    /// `key=a&key=b`
    Repeat,
    /// `key=a,b`
    Comma,
}

/// Outgoing serialization rule for one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRef {
    /// JSON:API type of the related resource; defaults to the key.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    /// Whether full related records are written to `included`.
    #[serde(default = "default_true")]
    pub included: bool,
}

impl Default for RelationshipRef {
    fn default() -> Self {
        Self { type_name: None, included: true }
    }
}

fn default_true() -> bool {
    true
}

/// Per-resource options for request documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializerOptions {
    /// Allow-list of record keys written as attributes or relationships.
    /// `None` means every key except `id` and `links`.
    pub attributes: Option<Vec<String>>,
    pub key_for_attribute: KeyCase,
    /// Keys always serialized as relationships.
    pub relationships: BTreeMap<String, RelationshipRef>,
    /// Keys kept as attributes even when their value looks like a reference.
    pub plain_attributes: Vec<String>,
}

/// Computes a relationship value from its identifier and the flattened
/// included record, if the document carried one.
pub type ValueForRelationship = Arc<dyn Fn(&Id, Option<Record>) -> Value + Send + Sync>;

/// How a relationship is turned into a record value.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipMapping {
    /// The included record when present, `{id}` otherwise.
    #[default]
    IncludedOrReference,
    /// The bare id string.
    Identifier,
    /// Caller-supplied mapping.
    #[serde(skip)]
    Custom(ValueForRelationship),
}

impl RelationshipMapping {
    pub fn value_for(&self, id: &Id, included: Option<Record>) -> Value {
        match self {
            RelationshipMapping::IncludedOrReference => match included {
                Some(record) => Value::Object(record),
                None => id.to_reference(),
            },
            RelationshipMapping::Identifier => Value::String(id.to_string()),
            RelationshipMapping::Custom(f) => f(id, included),
        }
    }
}

impl fmt::Debug for RelationshipMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipMapping::IncludedOrReference => f.write_str("IncludedOrReference"),
            RelationshipMapping::Identifier => f.write_str("Identifier"),
            RelationshipMapping::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Returns the configured mapping for `name`, or the `{id}` fallback.
pub fn resolve_relationship_options(
    name: &str,
    overrides: &BTreeMap<String, RelationshipMapping>,
) -> RelationshipMapping {
    overrides.get(name).cloned().unwrap_or_default()
}

/// Per-resource options for response documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeserializerOptions {
    pub key_for_attribute: KeyCase,
    /// Copy the resource `type` into the record.
    pub type_as_attribute: bool,
    pub relationships: BTreeMap<String, RelationshipMapping>,
}

impl DeserializerOptions {
    pub fn relationship(&self, name: &str) -> RelationshipMapping {
        resolve_relationship_options(name, &self.relationships)
    }
}

/// Resolved client settings.
///
/// Build with [`Settings::resolve`] (or `Default`); deserializing this type
/// directly skips the defaults merge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Meta field holding the total count; `None` counts returned records.
    pub total: Option<String>,
    pub update_method: HttpMethod,
    pub array_format: ArrayFormat,
    #[serde(default)]
    pub serializer_opts: BTreeMap<String, SerializerOptions>,
    #[serde(default)]
    pub deserializer_opts: BTreeMap<String, DeserializerOptions>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            total: Some("total".to_string()),
            update_method: HttpMethod::Patch,
            array_format: ArrayFormat::Brackets,
            serializer_opts: BTreeMap::new(),
            deserializer_opts: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// The default settings as JSON, the base of every merge.
    pub fn defaults_json() -> Value {
        json!({
            "total": "total",
            "updateMethod": "PATCH",
            "arrayFormat": "brackets",
            "serializerOpts": {},
            "deserializerOpts": {},
            "headers": {},
        })
    }

    /// Deep-merge `user` over the defaults and deserialize the result.
    pub fn resolve(user: Value) -> Result<Self> {
        let user = match user {
            Value::Null => Value::Object(Default::default()),
            obj @ Value::Object(_) => obj,
            other => {
                return Err(ApiError::Config(format!("settings must be an object, got {other}")))
            }
        };
        let mut merged = Self::defaults_json();
        deep_merge(&mut merged, user);
        serde_json::from_value(merged).map_err(|e| ApiError::Config(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let user: Value = serde_json::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))?;
        Self::resolve(user)
    }

    /// Headers for every request: JSON:API content negotiation first, then
    /// user headers other than `Accept`/`Content-Type`.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), JSONAPI_MEDIA_TYPE.to_string()),
            ("Content-Type".to_string(), JSONAPI_MEDIA_TYPE.to_string()),
        ];
        headers.extend(
            self.headers
                .iter()
                .filter(|(name, _)| {
                    !name.eq_ignore_ascii_case("accept") && !name.eq_ignore_ascii_case("content-type")
                })
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        headers
    }

    pub fn serializer_options(&self, resource: &str) -> Cow<'_, SerializerOptions> {
        match self.serializer_opts.get(resource) {
            Some(opts) => Cow::Borrowed(opts),
            None => Cow::Owned(SerializerOptions::default()),
        }
    }

    pub fn deserializer_options(&self, resource: &str) -> Cow<'_, DeserializerOptions> {
        match self.deserializer_opts.get(resource) {
            Some(opts) => Cow::Borrowed(opts),
            None => Cow::Owned(DeserializerOptions::default()),
        }
    }
}

/// Objects merge key-wise; everything else (arrays, scalars, null) replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overrides_yield_defaults() {
        let settings = Settings::resolve(json!({})).unwrap();
        assert_eq!(settings.total.as_deref(), Some("total"));
        assert_eq!(settings.update_method, HttpMethod::Patch);
        assert_eq!(settings.array_format, ArrayFormat::Brackets);
        assert!(settings.serializer_opts.is_empty());

        let null = Settings::resolve(Value::Null).unwrap();
        assert_eq!(null.total, Settings::default().total);
    }

    #[test]
    fn null_total_opts_out() {
        let settings = Settings::resolve(json!({"total": null})).unwrap();
        assert!(settings.total.is_none());
    }

    #[test]
    fn overrides_win_and_nested_objects_merge() {
        let settings = Settings::resolve(json!({
            "updateMethod": "PUT",
            "arrayFormat": "comma",
            "deserializerOpts": {"posts": {"keyForAttribute": "camelCase"}},
        }))
        .unwrap();
        assert_eq!(settings.update_method, HttpMethod::Put);
        assert_eq!(settings.array_format, ArrayFormat::Comma);
        assert_eq!(settings.total.as_deref(), Some("total"));
        assert_eq!(
            settings.deserializer_options("posts").key_for_attribute,
            KeyCase::CamelCase
        );
    }

    #[test]
    fn deep_merge_keeps_sibling_keys() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "b": [1, 2]});
        deep_merge(&mut base, json!({"a": {"y": 3}, "b": [9]}));
        assert_eq!(base, json!({"a": {"x": 1, "y": 3}, "b": [9]}));
    }

    #[test]
    fn invalid_shapes_are_config_errors() {
        assert!(matches!(Settings::resolve(json!(["x"])), Err(ApiError::Config(_))));
        assert!(matches!(
            Settings::resolve(json!({"updateMethod": "FETCH"})),
            Err(ApiError::Config(_))
        ));
        assert!(matches!(Settings::from_json_str("{"), Err(ApiError::Config(_))));
    }

    #[test]
    fn content_negotiation_headers_cannot_be_overridden() {
        let settings = Settings::resolve(json!({
            "headers": {"content-type": "text/plain", "Authorization": "Bearer t"}
        }))
        .unwrap();
        let headers = settings.request_headers();
        assert_eq!(
            headers,
            vec![
                ("Accept".to_string(), JSONAPI_MEDIA_TYPE.to_string()),
                ("Content-Type".to_string(), JSONAPI_MEDIA_TYPE.to_string()),
                ("Authorization".to_string(), "Bearer t".to_string()),
            ]
        );
    }

    #[test]
    fn unconfigured_relationship_falls_back_to_reference() {
        let overrides = BTreeMap::new();
        let mapping = resolve_relationship_options("author", &overrides);
        assert_eq!(mapping.value_for(&Id::from("9"), None), json!({"id": "9"}));

        let mut included = Record::new();
        included.insert("id".into(), json!("9"));
        included.insert("name".into(), json!("Ada"));
        assert_eq!(
            mapping.value_for(&Id::from("9"), Some(included)),
            json!({"id": "9", "name": "Ada"})
        );
    }

    #[test]
    fn configured_relationship_mapping_wins() {
        let settings = Settings::resolve(json!({
            "deserializerOpts": {"posts": {"relationships": {"author": "identifier"}}}
        }))
        .unwrap();
        let opts = settings.deserializer_options("posts");
        assert_eq!(opts.relationship("author").value_for(&Id::from("9"), None), json!("9"));
        assert_eq!(opts.relationship("tags").value_for(&Id::from("1"), None), json!({"id": "1"}));
    }

    #[test]
    fn custom_mapping_is_called() {
        let custom = RelationshipMapping::Custom(Arc::new(|id, included| {
            json!({"ref": id.as_str(), "loaded": included.is_some()})
        }));
        assert_eq!(
            custom.value_for(&Id::from("2"), None),
            json!({"ref": "2", "loaded": false})
        );
    }
}
