//! Data provider that maps admin-UI CRUD verbs onto a JSON:API backend.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; `DataProvider` runs the round-trip through an
//! injected `HttpClient`. Requests become JSON:API query strings and
//! documents, responses become flat records with relationships unwrapped and
//! list totals read from `meta`.
//!
//! # Design
//! - `JsonApiClient` is stateless: `base_url` plus resolved `Settings`.
//! - Each verb is split into `build_*` and `parse_*`, so the I/O boundary is
//!   explicit and the mapping is testable without a server.
//! - Verbs are a closed enum; unknown verb names fail before any I/O.
//! - Wire types are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod case;
pub mod client;
pub mod deserializer;
pub mod document;
pub mod error;
pub mod http;
pub mod provider;
pub mod query;
pub mod request;
#[cfg(feature = "reqwest")]
pub mod reqwest_client;
pub mod serializer;
pub mod settings;
pub mod types;

pub use client::JsonApiClient;
pub use error::{ApiError, Result, TransportError};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use provider::DataProvider;
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;
pub use request::{
    CreateParams, DataRequest, DeleteManyParams, DeleteParams, GetListParams, GetManyParams,
    GetManyReferenceParams, GetOneParams, Pagination, Sort, UpdateManyParams, UpdateParams, Verb,
};
pub use settings::{ArrayFormat, RelationshipMapping, Settings};
pub use types::{DataResponse, DeleteResult, Id, IdsResult, ListResult, Record, RecordResult};
