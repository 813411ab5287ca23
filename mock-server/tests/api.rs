use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockConfig, JSONAPI_CONTENT_TYPE};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn jsonapi_request(method: &str, uri: &str, body: &Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, JSONAPI_CONTENT_TYPE)
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- list ---

#[tokio::test]
async fn list_empty_collection_has_total() {
    let resp = app().oneshot(get("/posts")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], JSONAPI_CONTENT_TYPE);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"], json!([]));
    assert_eq!(doc["meta"]["total"], 0);
}

#[tokio::test]
async fn list_without_total_field_omits_meta() {
    let app = app_with(MockConfig { total_field: None });
    let resp = app.oneshot(get("/posts")).await.unwrap();

    let doc = body_json(resp).await;
    assert!(doc.get("meta").is_none());
}

#[tokio::test]
async fn list_rejects_bad_pagination() {
    let resp = app().oneshot(get("/posts?page[number]=x")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let doc = body_json(resp).await;
    assert_eq!(doc["errors"][0]["status"], "400");
}

#[tokio::test]
async fn list_rejects_out_of_range_pagination() {
    let uri = format!("/posts?page[number]={}&page[size]={}", usize::MAX, usize::MAX);
    let resp = app().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let doc = body_json(resp).await;
    assert_eq!(doc["errors"][0]["status"], "400");
}

// --- create ---

#[tokio::test]
async fn create_returns_201_with_generated_id() {
    let resp = app()
        .oneshot(jsonapi_request(
            "POST",
            "/posts",
            &json!({"data": {"type": "posts", "attributes": {"title": "Hello"}}}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["type"], "posts");
    assert_eq!(doc["data"]["attributes"]["title"], "Hello");
    assert!(doc["data"]["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn create_with_mismatched_type_returns_409() {
    let resp = app()
        .oneshot(jsonapi_request("POST", "/posts", &json!({"data": {"type": "people"}})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_without_type_returns_422() {
    let resp = app()
        .oneshot(jsonapi_request("POST", "/posts", &json!({"data": {"attributes": {}}})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get / update / delete of missing resources ---

#[tokio::test]
async fn get_missing_returns_404() {
    let resp = app().oneshot(get("/posts/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_missing_returns_404() {
    let resp = app()
        .oneshot(jsonapi_request(
            "PATCH",
            "/posts/nope",
            &json!({"data": {"id": "nope", "type": "posts", "attributes": {"title": "x"}}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_returns_404() {
    let resp = app()
        .oneshot(Request::builder().method("DELETE").uri("/posts/nope").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle_with_relationships() {
    let app = app();

    // clones share the same store
    macro_rules! send {
        ($req:expr) => {
            app.clone().oneshot($req).await.unwrap()
        };
    }

    // author
    let resp = send!(jsonapi_request(
        "POST",
        "/people",
        &json!({"data": {"id": "9", "type": "people", "attributes": {"name": "Ada"}}}),
    ));
    assert_eq!(resp.status(), StatusCode::CREATED);

    // two posts by the same author
    for (id, title, views) in [("1", "Second", 5), ("2", "First", 50)] {
        let resp = send!(jsonapi_request(
            "POST",
            "/posts",
            &json!({"data": {
                "id": id,
                "type": "posts",
                "attributes": {"title": title, "views": views},
                "relationships": {"author": {"data": {"type": "people", "id": "9"}}}
            }}),
        ));
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // list sorted by views descending, one per page
    let resp = send!(get("/posts?page[number]=1&page[size]=1&sort=-views"));
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert_eq!(doc["meta"]["total"], 2);
    assert_eq!(doc["data"].as_array().unwrap().len(), 1);
    assert_eq!(doc["data"][0]["id"], "2");
    assert_eq!(doc["included"][0]["attributes"]["name"], "Ada");

    // filter by id array
    let resp = send!(get("/posts?filter[id][]=1&filter[id][]=3"));
    let doc = body_json(resp).await;
    assert_eq!(doc["meta"]["total"], 1);
    assert_eq!(doc["data"][0]["id"], "1");

    // filter by relationship
    let resp = send!(get("/posts?filter[author]=9"));
    let doc = body_json(resp).await;
    assert_eq!(doc["meta"]["total"], 2);

    // update keeps untouched attributes
    let resp = send!(jsonapi_request(
        "PATCH",
        "/posts/1",
        &json!({"data": {"id": "1", "type": "posts", "attributes": {"title": "Renamed"}}}),
    ));
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["attributes"]["title"], "Renamed");
    assert_eq!(doc["data"]["attributes"]["views"], 5);

    // get
    let resp = send!(get("/posts/1"));
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["attributes"]["title"], "Renamed");
    assert_eq!(doc["included"][0]["id"], "9");

    // delete
    let resp = send!(Request::builder().method("DELETE").uri("/posts/1").body(String::new()).unwrap());
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete
    let resp = send!(get("/posts/1"));
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send!(get("/posts"));
    let doc = body_json(resp).await;
    assert_eq!(doc["meta"]["total"], 1);
}
