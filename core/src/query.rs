//! Query string construction.
//!
//! # Design
//! `Query` is an ordered parameter set that stringifies nested JSON the way
//! the `qs` family of serializers does: objects become `key[sub]`, arrays
//! follow the configured [`ArrayFormat`]. Setting an existing key replaces it
//! in place, so every key is emitted once.
//!
//! Values and key segments are form-urlencoded; the bracket characters that
//! give keys their structure stay literal (`filter[post_id]=5`).

use serde_json::Value;
use url::form_urlencoded::byte_serialize;

use crate::request::{GetListParams, GetManyReferenceParams, Pagination, Sort};
use crate::settings::ArrayFormat;
use crate::types::Id;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, Value)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key`, replacing any earlier value while keeping its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self, format: ArrayFormat) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.params {
            stringify(key, value, format, &mut pairs);
        }
        pairs.join("&")
    }
}

fn stringify(prefix: &str, value: &Value, format: ArrayFormat, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                stringify(&format!("{prefix}[{key}]"), nested, format, out);
            }
        }
        Value::Array(items) => stringify_array(prefix, items, format, out),
        scalar => out.push(pair(prefix, &scalar_text(scalar))),
    }
}

fn stringify_array(prefix: &str, items: &[Value], format: ArrayFormat, out: &mut Vec<String>) {
    if items.is_empty() {
        return;
    }
    let all_scalar = items.iter().all(|v| !v.is_object() && !v.is_array());
    match format {
        // Comma joining only makes sense for scalars; nested items use indices.
        ArrayFormat::Comma if all_scalar => {
            let joined = items
                .iter()
                .map(|v| encode_value(&scalar_text(v)))
                .collect::<Vec<_>>()
                .join(",");
            out.push(format!("{}={joined}", encode_key(prefix)));
        }
        ArrayFormat::Indices | ArrayFormat::Comma => {
            for (i, item) in items.iter().enumerate() {
                stringify(&format!("{prefix}[{i}]"), item, format, out);
            }
        }
        ArrayFormat::Brackets => {
            for item in items {
                stringify(&format!("{prefix}[]"), item, format, out);
            }
        }
        ArrayFormat::Repeat => {
            for item in items {
                stringify(prefix, item, format, out);
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{}={}", encode_key(key), encode_value(value))
}

fn encode_value(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

fn encode_key(key: &str) -> String {
    encode_value(key).replace("%5B", "[").replace("%5D", "]")
}

fn set_pagination(query: &mut Query, pagination: Pagination) {
    query.set("page[number]", pagination.page);
    query.set("page[size]", pagination.per_page);
}

fn set_filters(query: &mut Query, filter: &serde_json::Map<String, Value>) {
    for (key, value) in filter {
        query.set(format!("filter[{key}]"), value.clone());
    }
}

fn set_sort(query: &mut Query, sort: Option<&Sort>) {
    if let Some(param) = sort.and_then(Sort::to_param) {
        query.set("sort", param);
    }
}

/// `page[...]`, `filter[...]` and `sort` for a list request.
pub fn list_query(params: &GetListParams) -> Query {
    let mut query = Query::new();
    set_pagination(&mut query, params.pagination);
    set_filters(&mut query, &params.filter);
    set_sort(&mut query, params.sort.as_ref());
    query
}

/// `filter[id]` holding every requested id.
pub fn many_query(ids: &[Id]) -> Query {
    let mut query = Query::new();
    let ids: Vec<Value> = ids.iter().map(|id| Value::String(id.to_string())).collect();
    query.set("filter[id]", Value::Array(ids));
    query
}

/// A list query plus `filter[<target>]=<id>`.
pub fn reference_query(params: &GetManyReferenceParams) -> Query {
    let mut query = Query::new();
    set_pagination(&mut query, params.pagination);
    set_filters(&mut query, &params.filter);
    query.set(format!("filter[{}]", params.target), params.id.to_string());
    set_sort(&mut query, params.sort.as_ref());
    query
}
