//! Stateless HTTP request builder and response parser for a JSON:API backend.
//!
//! # Design
//! `JsonApiClient` holds only a `base_url` and resolved `Settings`, and
//! carries no mutable state between calls. Each verb is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The caller (usually `DataProvider`)
//! executes the HTTP round-trip in between.

use tracing::{debug, warn};

use crate::deserializer::{extract_total, parse_document, unwrap_collection, unwrap_single};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::{list_query, many_query, reference_query, Query};
use crate::request::{
    CreateParams, DataRequest, DeleteParams, GetListParams, GetManyParams, GetManyReferenceParams,
    GetOneParams, UpdateParams,
};
use crate::serializer::build_document;
use crate::settings::Settings;
use crate::types::{DataResponse, DeleteResult, DeletedRecord, Id, ListResult, RecordResult};

/// Synchronous, stateless client for a JSON:API backend.
#[derive(Debug, Clone)]
pub struct JsonApiClient {
    base_url: String,
    settings: Settings,
}

impl JsonApiClient {
    pub fn new(base_url: &str, settings: Settings) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn collection_url(&self, resource: &str, query: Option<&Query>) -> String {
        let mut url = format!("{}/{resource}", self.base_url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(&query.to_query_string(self.settings.array_format));
        }
        url
    }

    fn record_url(&self, resource: &str, id: &Id) -> String {
        format!("{}/{resource}/{id}", self.base_url)
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        debug!(method = method.as_str(), %url, has_body = body.is_some(), "built request");
        HttpRequest {
            method,
            url,
            headers: self.settings.request_headers(),
            body,
        }
    }

    pub fn build_get_list(&self, resource: &str, params: &GetListParams) -> HttpRequest {
        let url = self.collection_url(resource, Some(&list_query(params)));
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get_one(&self, resource: &str, params: &GetOneParams) -> HttpRequest {
        self.request(HttpMethod::Get, self.record_url(resource, &params.id), None)
    }

    pub fn build_get_many(&self, resource: &str, params: &GetManyParams) -> HttpRequest {
        let url = self.collection_url(resource, Some(&many_query(&params.ids)));
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get_many_reference(
        &self,
        resource: &str,
        params: &GetManyReferenceParams,
    ) -> HttpRequest {
        let url = self.collection_url(resource, Some(&reference_query(params)));
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_create(&self, resource: &str, params: &CreateParams) -> Result<HttpRequest> {
        let options = self.settings.serializer_options(resource);
        let document = build_document(resource, None, &params.data, &options)?;
        let body = serde_json::to_string(&document).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Post, self.collection_url(resource, None), Some(body)))
    }

    pub fn build_update(&self, resource: &str, params: &UpdateParams) -> Result<HttpRequest> {
        let options = self.settings.serializer_options(resource);
        let document = build_document(resource, Some(&params.id), &params.data, &options)?;
        let body = serde_json::to_string(&document).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(
            self.settings.update_method,
            self.record_url(resource, &params.id),
            Some(body),
        ))
    }

    pub fn build_delete(&self, resource: &str, params: &DeleteParams) -> HttpRequest {
        self.request(HttpMethod::Delete, self.record_url(resource, &params.id), None)
    }

    /// Build the request for any single-exchange verb.
    pub fn build(&self, resource: &str, request: &DataRequest) -> Result<HttpRequest> {
        Ok(match request {
            DataRequest::GetList(params) => self.build_get_list(resource, params),
            DataRequest::GetOne(params) => self.build_get_one(resource, params),
            DataRequest::GetMany(params) => self.build_get_many(resource, params),
            DataRequest::GetManyReference(params) => self.build_get_many_reference(resource, params),
            DataRequest::Create(params) => self.build_create(resource, params)?,
            DataRequest::Update(params) => self.build_update(resource, params)?,
            DataRequest::Delete(params) => self.build_delete(resource, params),
        })
    }

    /// Parse a collection response: records plus total.
    pub fn parse_list(&self, resource: &str, response: HttpResponse) -> Result<ListResult> {
        check_status(&response)?;
        let document = parse_document(&response.body)?;
        let total = extract_total(&document, &self.settings)?;
        let options = self.settings.deserializer_options(resource);
        let data = unwrap_collection(&document, &options)?;
        Ok(ListResult { data, total })
    }

    /// Parse a single-resource response (get-one, create).
    pub fn parse_record(&self, resource: &str, response: HttpResponse) -> Result<RecordResult> {
        check_status(&response)?;
        let document = parse_document(&response.body)?;
        let options = self.settings.deserializer_options(resource);
        Ok(RecordResult { data: unwrap_single(&document, &options)? })
    }

    /// Parse an update response. A `204 No Content` (or empty body) means the
    /// server accepted the update as sent.
    pub fn parse_update(
        &self,
        resource: &str,
        params: &UpdateParams,
        response: HttpResponse,
    ) -> Result<RecordResult> {
        check_status(&response)?;
        if response.status == 204 || response.body.trim().is_empty() {
            let mut data = params.data.clone();
            data.insert("id".to_string(), serde_json::Value::String(params.id.to_string()));
            return Ok(RecordResult { data });
        }
        self.parse_record(resource, response)
    }

    /// Parse a delete response. The body is ignored.
    pub fn parse_delete(&self, params: &DeleteParams, response: HttpResponse) -> Result<DeleteResult> {
        check_status(&response)?;
        Ok(DeleteResult { data: DeletedRecord { id: params.id.clone() } })
    }

    /// Parse the response for any single-exchange verb.
    pub fn parse(
        &self,
        resource: &str,
        request: &DataRequest,
        response: HttpResponse,
    ) -> Result<DataResponse> {
        Ok(match request {
            DataRequest::GetList(_) | DataRequest::GetMany(_) | DataRequest::GetManyReference(_) => {
                DataResponse::List(self.parse_list(resource, response)?)
            }
            DataRequest::GetOne(_) | DataRequest::Create(_) => {
                DataResponse::Record(self.parse_record(resource, response)?)
            }
            DataRequest::Update(params) => {
                DataResponse::Record(self.parse_update(resource, params, response)?)
            }
            DataRequest::Delete(params) => DataResponse::Deleted(self.parse_delete(params, response)?),
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, "request failed");
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
