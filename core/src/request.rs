//! Verb vocabulary and per-verb parameters.
//!
//! # Design
//! `Verb` is a closed enum parsed from the admin UI's method names (and the
//! older action constants), so an unknown verb is rejected before any request
//! is built. Parameter structs deserialize from the UI's camelCase JSON.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::types::{Id, Record};

/// Every request type the provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    GetList,
    GetOne,
    GetMany,
    GetManyReference,
    Create,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
}

impl Verb {
    pub const ALL: [Verb; 9] = [
        Verb::GetList,
        Verb::GetOne,
        Verb::GetMany,
        Verb::GetManyReference,
        Verb::Create,
        Verb::Update,
        Verb::UpdateMany,
        Verb::Delete,
        Verb::DeleteMany,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::GetList => "getList",
            Verb::GetOne => "getOne",
            Verb::GetMany => "getMany",
            Verb::GetManyReference => "getManyReference",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::UpdateMany => "updateMany",
            Verb::Delete => "delete",
            Verb::DeleteMany => "deleteMany",
        }
    }

    fn constant(self) -> &'static str {
        match self {
            Verb::GetList => "GET_LIST",
            Verb::GetOne => "GET_ONE",
            Verb::GetMany => "GET_MANY",
            Verb::GetManyReference => "GET_MANY_REFERENCE",
            Verb::Create => "CREATE",
            Verb::Update => "UPDATE",
            Verb::UpdateMany => "UPDATE_MANY",
            Verb::Delete => "DELETE",
            Verb::DeleteMany => "DELETE_MANY",
        }
    }

    /// Verbs answered with `{data: [...], total}`.
    pub fn is_list_shaped(self) -> bool {
        matches!(self, Verb::GetList | Verb::GetMany | Verb::GetManyReference)
    }

    /// Verbs that fan out into one request per id.
    pub fn is_batch(self) -> bool {
        matches!(self, Verb::UpdateMany | Verb::DeleteMany)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s || verb.constant() == s)
            .ok_or_else(|| ApiError::UnsupportedVerb(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub order: String,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: impl Into<String>) -> Self {
        Self { field: field.into(), order: order.into() }
    }

    /// `field` for `ASC`, `-field` for any other order; `None` without a field.
    pub fn to_param(&self) -> Option<String> {
        if self.field.is_empty() {
            return None;
        }
        let prefix = if self.order == "ASC" { "" } else { "-" };
        Some(format!("{prefix}{}", self.field))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetListParams {
    pub pagination: Pagination,
    #[serde(default)]
    pub filter: Map<String, Value>,
    #[serde(default)]
    pub sort: Option<Sort>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetOneParams {
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetManyParams {
    pub ids: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetManyReferenceParams {
    pub target: String,
    pub id: Id,
    pub pagination: Pagination,
    #[serde(default)]
    pub filter: Map<String, Value>,
    #[serde(default)]
    pub sort: Option<Sort>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateParams {
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    pub id: Id,
    pub data: Record,
    /// Sent by the UI; not used to build the request.
    #[serde(default)]
    pub previous_data: Option<Record>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateManyParams {
    pub ids: Vec<Id>,
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteParams {
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteManyParams {
    pub ids: Vec<Id>,
}

/// A request that maps to exactly one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRequest {
    GetList(GetListParams),
    GetOne(GetOneParams),
    GetMany(GetManyParams),
    GetManyReference(GetManyReferenceParams),
    Create(CreateParams),
    Update(UpdateParams),
    Delete(DeleteParams),
}

impl DataRequest {
    pub fn verb(&self) -> Verb {
        match self {
            DataRequest::GetList(_) => Verb::GetList,
            DataRequest::GetOne(_) => Verb::GetOne,
            DataRequest::GetMany(_) => Verb::GetMany,
            DataRequest::GetManyReference(_) => Verb::GetManyReference,
            DataRequest::Create(_) => Verb::Create,
            DataRequest::Update(_) => Verb::Update,
            DataRequest::Delete(_) => Verb::Delete,
        }
    }

    /// Build a single request from untyped params. Batch verbs are rejected;
    /// they are expanded by the provider.
    pub fn from_params(verb: Verb, params: Value) -> Result<Self> {
        Ok(match verb {
            Verb::GetList => DataRequest::GetList(parse_params(verb, params)?),
            Verb::GetOne => DataRequest::GetOne(parse_params(verb, params)?),
            Verb::GetMany => DataRequest::GetMany(parse_params(verb, params)?),
            Verb::GetManyReference => DataRequest::GetManyReference(parse_params(verb, params)?),
            Verb::Create => DataRequest::Create(parse_params(verb, params)?),
            Verb::Update => DataRequest::Update(parse_params(verb, params)?),
            Verb::Delete => DataRequest::Delete(parse_params(verb, params)?),
            Verb::UpdateMany | Verb::DeleteMany => {
                return Err(ApiError::InvalidParams {
                    verb: verb.to_string(),
                    message: "batch verbs do not map to a single request".to_string(),
                })
            }
        })
    }
}

/// Deserialize verb params, reporting shape errors as `InvalidParams`.
pub fn parse_params<T: DeserializeOwned>(verb: Verb, params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| ApiError::InvalidParams {
        verb: verb.to_string(),
        message: e.to_string(),
    })
}
