use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use findex_core::{DocId, IndexError, IndexService, QueryOutcome, ServiceError, Update};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<DocId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// JSON body for `POST /update_index`. All three parts are optional but at
/// least one must be present: `documents` carries caller-supplied IDs,
/// `terms` is a pre-tokenized posting merge, `texts` get service-assigned
/// IDs (returned in the response).
#[derive(Deserialize, Default)]
pub struct UpdateRequest {
    #[serde(default)]
    pub documents: BTreeMap<DocId, String>,
    #[serde(default)]
    pub terms: HashMap<String, BTreeSet<DocId>>,
    #[serde(default)]
    pub texts: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IndexService>,
}

pub fn build_app(snapshot_path: PathBuf) -> Result<Router> {
    let service = Arc::new(IndexService::open(snapshot_path)?);
    Ok(router(service))
}

/// Router over an already-opened service; the service instance is injected
/// here so nothing in the transport layer holds ambient index state.
pub fn router(service: Arc<IndexService>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/update_index", post(update_handler))
        .route("/doc/:doc_id", delete(remove_handler))
        .route("/stats", get(stats_handler))
        .with_state(AppState { service })
        .layer(cors)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    let Some(query) = params.query else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Query parameter is missing" })),
        );
    };

    match state.service.query(&query) {
        QueryOutcome::Hits(results) => (StatusCode::OK, Json(json!({ "results": results }))),
        QueryOutcome::EmptyQuery => (StatusCode::OK, Json(json!({ "results": [] }))),
        QueryOutcome::PartialMiss(term) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "results": [],
                "message": format!("No entries found for the word: {term}"),
            })),
        ),
    }
}

pub async fn update_handler(
    State(state): State<AppState>,
    body: Option<Json<UpdateRequest>>,
) -> (StatusCode, Json<Value>) {
    let Some(Json(req)) = body else {
        return no_data();
    };
    let update = Update {
        documents: req.documents,
        terms: req.terms,
        texts: req.texts,
    };
    if update.is_empty() {
        return no_data();
    }

    match state.service.apply(update) {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "message": "Index updated successfully",
                "ids": receipt.assigned,
            })),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn remove_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> (StatusCode, Json<Value>) {
    match state.service.remove_document(doc_id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Document removed" }))),
        Err(err) => error_response(err),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    let (num_docs, num_terms) = state.service.stats();
    Json(json!({ "num_docs": num_docs, "num_terms": num_terms }))
}

fn no_data() -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "No data provided" })))
}

fn error_response(err: ServiceError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        ServiceError::Index(IndexError::DuplicateDocument(_)) => StatusCode::CONFLICT,
        ServiceError::Index(IndexError::DocumentIdOutOfRange(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(%err, "update failed");
    (status, Json(json!({ "error": err.to_string() })))
}
