use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

fn app(path: &std::path::Path) -> Router {
    findex_server::build_app(path.join("index.bin")).unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn seed(app: &Router) {
    let (status, _) = post_json(
        app.clone(),
        "/update_index",
        json!({ "documents": {
            "0": "Python is great",
            "1": "Python is essential",
            "2": "Great minds",
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn search_intersects_query_terms() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, body) = get(app, "/search?query=python%20great").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([0]));
}

#[tokio::test]
async fn unknown_term_is_404_with_message() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, body) = get(app, "/search?query=unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["message"], "No entries found for the word: unknown");
}

#[tokio::test]
async fn missing_query_parameter_is_400() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = get(app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query parameter is missing");
}

#[tokio::test]
async fn empty_query_matches_nothing() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, body) = get(app, "/search?query=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn update_without_data_is_400() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = post_json(app.clone(), "/update_index", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    // no body at all
    let req = Request::post("/update_index").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn texts_get_assigned_ids() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = post_json(
        app.clone(),
        "/update_index",
        json!({ "texts": ["Rust is fast", "Rust is safe"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Index updated successfully");
    assert_eq!(body["ids"], json!([0, 1]));

    let (status, body) = get(app, "/search?query=rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([0, 1]));
}

#[tokio::test]
async fn term_merge_payload_is_accepted() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, _) = post_json(
        app.clone(),
        "/update_index",
        json!({ "terms": { "python": [5], "ocaml": [5] } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(app, "/search?query=python").await;
    assert_eq!(body["results"], json!([0, 1, 5]));
}

#[tokio::test]
async fn out_of_range_document_id_is_400() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, _) = post_json(
        app.clone(),
        "/update_index",
        json!({ "terms": { "edge": [4294967295u32] } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app.clone(),
        "/update_index",
        json!({ "documents": { "4294967295": "edge case" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the rejected batches left the index untouched
    let (status, body) = get(app, "/search?query=python").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([0, 1]));
}

#[tokio::test]
async fn duplicate_document_id_is_409() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let (status, _) = post_json(
        app,
        "/update_index",
        json!({ "documents": { "0": "replacement text" } }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn removing_a_document_narrows_results() {
    let dir = tempdir().unwrap();
    let app = app(dir.path());
    seed(&app).await;

    let req = Request::delete("/doc/0").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = get(app, "/search?query=python").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([1]));
}

#[tokio::test]
async fn index_survives_restart() {
    let dir = tempdir().unwrap();
    {
        let app = app(dir.path());
        seed(&app).await;
    }
    let app = app(dir.path());
    let (status, body) = get(app, "/search?query=minds").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([2]));
}
