use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

pub const JSONAPI_CONTENT_TYPE: &str = "application/vnd.api+json";

/// A stored JSON:API resource object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub relationships: Map<String, Value>,
}

impl Resource {
    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// `(type, id)` of every related resource.
    fn related(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for relationship in self.relationships.values() {
            let data = relationship.get("data").unwrap_or(&Value::Null);
            let identifiers: Vec<&Value> = match data {
                Value::Array(items) => items.iter().collect(),
                Value::Object(_) => vec![data],
                _ => Vec::new(),
            };
            for identifier in identifiers {
                if let (Some(kind), Some(id)) = (
                    identifier.get("type").and_then(Value::as_str),
                    identifier.get("id").and_then(Value::as_str),
                ) {
                    out.push((kind.to_string(), id.to_string()));
                }
            }
        }
        out
    }
}

/// Request body for create and update.
#[derive(Deserialize)]
pub struct Envelope {
    pub data: Resource,
}

/// Server behavior knobs.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Meta field carrying the collection total; `None` omits `meta`.
    pub total_field: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self { total_field: Some("total".to_string()) }
    }
}

/// Resources by type, in insertion order.
#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<String, Vec<Resource>>,
}

impl Store {
    fn find(&self, kind: &str, id: &str) -> Option<&Resource> {
        self.collections.get(kind)?.iter().find(|r| r.id() == id)
    }

    fn included_for(&self, primary: &[&Resource]) -> Vec<Resource> {
        let mut included: Vec<Resource> = Vec::new();
        for resource in primary {
            for (kind, id) in resource.related() {
                let seen = included.iter().any(|r| r.kind == kind && r.id() == id);
                if seen {
                    continue;
                }
                if let Some(found) = self.find(&kind, &id) {
                    included.push(found.clone());
                }
            }
        }
        included
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    config: Arc<MockConfig>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        config: Arc::new(config),
    };
    Router::new()
        .route("/{resource}", get(list_resources).post(create_resource))
        .route(
            "/{resource}/{id}",
            get(get_resource)
                .patch(update_resource)
                .put(update_resource)
                .delete(delete_resource),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn document(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, JSONAPI_CONTENT_TYPE)], Json(body)).into_response()
}

fn error(status: StatusCode, detail: &str) -> Response {
    document(
        status,
        json!({"errors": [{"status": status.as_str(), "title": status.canonical_reason(), "detail": detail}]}),
    )
}

/// Parsed `page[...]`, `filter[...]` and `sort` parameters.
#[derive(Debug, Default, PartialEq)]
pub struct ListQuery {
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
    pub filters: Vec<(String, Vec<String>)>,
    /// `(field, descending)`
    pub sort: Vec<(String, bool)>,
}

impl ListQuery {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut query = ListQuery::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match &*key {
                "page[number]" => {
                    query.page_number = Some(value.parse().map_err(|_| format!("bad page[number]: {value}"))?)
                }
                "page[size]" => {
                    query.page_size = Some(value.parse().map_err(|_| format!("bad page[size]: {value}"))?)
                }
                "sort" => {
                    for field in value.split(',').filter(|f| !f.is_empty()) {
                        match field.strip_prefix('-') {
                            Some(name) => query.sort.push((name.to_string(), true)),
                            None => query.sort.push((field.to_string(), false)),
                        }
                    }
                }
                key => {
                    if let Some(field) = filter_field(key) {
                        let values: Vec<String> = if field == "id" {
                            value.split(',').map(str::to_string).collect()
                        } else {
                            vec![value.into_owned()]
                        };
                        match query.filters.iter_mut().find(|(f, _)| *f == field) {
                            Some((_, existing)) => existing.extend(values),
                            None => query.filters.push((field.to_string(), values)),
                        }
                    }
                }
            }
        }
        Ok(query)
    }
}

/// `filter[name]`, `filter[name][]` and `filter[name][0]` all yield `name`.
fn filter_field(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("filter[")?;
    let end = rest.find(']')?;
    let tail = &rest[end + 1..];
    let indexed = tail.is_empty()
        || tail == "[]"
        || (tail.starts_with('[') && tail.ends_with(']') && tail[1..tail.len() - 1].parse::<usize>().is_ok());
    indexed.then(|| &rest[..end])
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_value(resource: &Resource, field: &str) -> Value {
    if field == "id" {
        return Value::String(resource.id().to_string());
    }
    if let Some(value) = resource.attributes.get(field) {
        return value.clone();
    }
    resource
        .relationships
        .get(field)
        .and_then(|rel| rel.get("data"))
        .and_then(|data| data.get("id"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn matches(resource: &Resource, filters: &[(String, Vec<String>)]) -> bool {
    filters.iter().all(|(field, accepted)| {
        let actual = scalar_text(&field_value(resource, field));
        accepted.iter().any(|v| *v == actual)
    })
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

async fn list_resources(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = match ListQuery::parse(raw.as_deref().unwrap_or_default()) {
        Ok(query) => query,
        Err(detail) => return error(StatusCode::BAD_REQUEST, &detail),
    };

    let store = state.db.read().await;
    let mut found: Vec<&Resource> = store
        .collections
        .get(&resource)
        .map(|all| all.iter().filter(|r| matches(r, &query.filters)).collect())
        .unwrap_or_default();

    found.sort_by(|a, b| {
        for (field, descending) in &query.sort {
            let ordering = compare(&field_value(a, field), &field_value(b, field));
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    let total = found.len();
    if let Some(size) = query.page_size {
        let page = query.page_number.unwrap_or(1).max(1);
        let Some(offset) = (page - 1).checked_mul(size) else {
            return error(StatusCode::BAD_REQUEST, "page[number] and page[size] are out of range");
        };
        found = found.into_iter().skip(offset).take(size).collect();
    }

    let mut body = json!({
        "data": found,
        "included": store.included_for(&found),
    });
    if let Some(field) = &state.config.total_field {
        let mut meta = Map::new();
        meta.insert(field.clone(), json!(total));
        body["meta"] = Value::Object(meta);
    }
    document(StatusCode::OK, body)
}

async fn create_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(input): Json<Envelope>,
) -> Response {
    let mut created = input.data;
    if created.kind != resource {
        return error(StatusCode::CONFLICT, "resource type does not match the endpoint");
    }
    let mut store = state.db.write().await;
    let id = created.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    if store.find(&resource, &id).is_some() {
        return error(StatusCode::CONFLICT, "a resource with this id already exists");
    }
    created.id = Some(id.clone());
    let included = store.included_for(&[&created]);
    store.collections.entry(resource.clone()).or_default().push(created.clone());
    info!(%resource, %id, "created");
    document(StatusCode::CREATED, json!({"data": created, "included": included}))
}

async fn get_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let store = state.db.read().await;
    match store.find(&resource, &id) {
        Some(found) => {
            let included = store.included_for(&[found]);
            document(StatusCode::OK, json!({"data": found, "included": included}))
        }
        None => error(StatusCode::NOT_FOUND, "no such resource"),
    }
}

async fn update_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(input): Json<Envelope>,
) -> Response {
    let patch = input.data;
    if patch.kind != resource || patch.id.as_deref().is_some_and(|patch_id| patch_id != id) {
        return error(StatusCode::CONFLICT, "resource type or id does not match the endpoint");
    }
    let mut store = state.db.write().await;
    let Some(existing) = store
        .collections
        .get_mut(&resource)
        .and_then(|all| all.iter_mut().find(|r| r.id() == id))
    else {
        return error(StatusCode::NOT_FOUND, "no such resource");
    };
    existing.attributes.extend(patch.attributes);
    existing.relationships.extend(patch.relationships);
    let updated = existing.clone();
    let included = store.included_for(&[&updated]);
    info!(%resource, %id, "updated");
    document(StatusCode::OK, json!({"data": updated, "included": included}))
}

async fn delete_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let mut store = state.db.write().await;
    let Some(all) = store.collections.get_mut(&resource) else {
        return error(StatusCode::NOT_FOUND, "no such resource");
    };
    match all.iter().position(|r| r.id() == id) {
        Some(index) => {
            all.remove(index);
            info!(%resource, %id, "deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        None => error(StatusCode::NOT_FOUND, "no such resource"),
    }
}
