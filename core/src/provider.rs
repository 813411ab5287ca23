//! Verb-level data provider over an injected `HttpClient`.
//!
//! # Design
//! `DataProvider` pairs a stateless `JsonApiClient` with the caller's
//! `HttpClient`. Every verb is build → execute → parse; the batch verbs fan
//! out one call per id and fail as soon as any call fails.

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::JsonApiClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::request::{
    parse_params, CreateParams, DataRequest, DeleteManyParams, DeleteParams, GetListParams,
    GetManyParams, GetManyReferenceParams, GetOneParams, UpdateManyParams, UpdateParams, Verb,
};
use crate::settings::Settings;
use crate::types::{DataResponse, DeleteResult, Id, IdsResult, ListResult, RecordResult};

#[derive(Debug, Clone)]
pub struct DataProvider<C> {
    client: JsonApiClient,
    http: C,
}

impl<C: HttpClient> DataProvider<C> {
    pub fn new(api_url: &str, settings: Settings, http: C) -> Self {
        Self {
            client: JsonApiClient::new(api_url, settings),
            http,
        }
    }

    pub fn client(&self) -> &JsonApiClient {
        &self.client
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let response = self.http.execute(request).await.map_err(ApiError::Transport)?;
        debug!(method, %url, status = response.status, "received response");
        Ok(response)
    }

    #[instrument(skip(self, params))]
    pub async fn get_list(&self, resource: &str, params: &GetListParams) -> Result<ListResult> {
        let response = self.send(self.client.build_get_list(resource, params)).await?;
        self.client.parse_list(resource, response)
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn get_one(&self, resource: &str, params: &GetOneParams) -> Result<RecordResult> {
        let response = self.send(self.client.build_get_one(resource, params)).await?;
        self.client.parse_record(resource, response)
    }

    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn get_many(&self, resource: &str, params: &GetManyParams) -> Result<ListResult> {
        let response = self.send(self.client.build_get_many(resource, params)).await?;
        self.client.parse_list(resource, response)
    }

    #[instrument(skip(self, params), fields(target = %params.target, id = %params.id))]
    pub async fn get_many_reference(
        &self,
        resource: &str,
        params: &GetManyReferenceParams,
    ) -> Result<ListResult> {
        let response = self.send(self.client.build_get_many_reference(resource, params)).await?;
        self.client.parse_list(resource, response)
    }

    #[instrument(skip(self, params))]
    pub async fn create(&self, resource: &str, params: &CreateParams) -> Result<RecordResult> {
        let response = self.send(self.client.build_create(resource, params)?).await?;
        self.client.parse_record(resource, response)
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn update(&self, resource: &str, params: &UpdateParams) -> Result<RecordResult> {
        let response = self.send(self.client.build_update(resource, params)?).await?;
        self.client.parse_update(resource, params, response)
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn delete(&self, resource: &str, params: &DeleteParams) -> Result<DeleteResult> {
        let response = self.send(self.client.build_delete(resource, params)).await?;
        self.client.parse_delete(params, response)
    }

    /// Update every id with the same data. Returns ids in input order.
    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn update_many(&self, resource: &str, params: &UpdateManyParams) -> Result<IdsResult> {
        let updates = params.ids.iter().map(|id| {
            let single = UpdateParams {
                id: id.clone(),
                data: params.data.clone(),
                previous_data: None,
            };
            async move { self.update(resource, &single).await }
        });
        let results = try_join_all(updates).await?;
        let data = results
            .iter()
            .zip(&params.ids)
            .map(|(result, requested)| {
                result
                    .data
                    .get("id")
                    .and_then(|id| Id::try_from(id).ok())
                    .unwrap_or_else(|| requested.clone())
            })
            .collect();
        Ok(IdsResult { data })
    }

    /// Delete every id. Returns ids in input order.
    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn delete_many(&self, resource: &str, params: &DeleteManyParams) -> Result<IdsResult> {
        let deletes = params.ids.iter().map(|id| {
            let single = DeleteParams { id: id.clone() };
            async move { self.delete(resource, &single).await }
        });
        let results = try_join_all(deletes).await?;
        Ok(IdsResult { data: results.into_iter().map(|r| r.data.id).collect() })
    }

    /// Run a single-exchange request.
    pub async fn execute(&self, resource: &str, request: &DataRequest) -> Result<DataResponse> {
        Ok(match request {
            DataRequest::GetList(params) => DataResponse::List(self.get_list(resource, params).await?),
            DataRequest::GetOne(params) => DataResponse::Record(self.get_one(resource, params).await?),
            DataRequest::GetMany(params) => DataResponse::List(self.get_many(resource, params).await?),
            DataRequest::GetManyReference(params) => {
                DataResponse::List(self.get_many_reference(resource, params).await?)
            }
            DataRequest::Create(params) => DataResponse::Record(self.create(resource, params).await?),
            DataRequest::Update(params) => DataResponse::Record(self.update(resource, params).await?),
            DataRequest::Delete(params) => DataResponse::Deleted(self.delete(resource, params).await?),
        })
    }

    /// Dispatch by verb name with untyped params. Unknown verbs fail before
    /// any request is sent.
    pub async fn call(&self, verb: &str, resource: &str, params: Value) -> Result<DataResponse> {
        let verb: Verb = verb.parse()?;
        match verb {
            Verb::UpdateMany => {
                let params: UpdateManyParams = parse_params(verb, params)?;
                Ok(DataResponse::Ids(self.update_many(resource, &params).await?))
            }
            Verb::DeleteMany => {
                let params: DeleteManyParams = parse_params(verb, params)?;
                Ok(DataResponse::Ids(self.delete_many(resource, &params).await?))
            }
            single => {
                let request = DataRequest::from_params(single, params)?;
                self.execute(resource, &request).await
            }
        }
    }
}
