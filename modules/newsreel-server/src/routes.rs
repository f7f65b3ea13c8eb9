use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use newsreel_cluster::{rank, ScoredThread};
use newsreel_common::{Category, Document, Language, NewsreelError};
use newsreel_store::{DeleteOutcome, PutOutcome, StoreError};

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/threads", get(threads))
        .route(
            "/article/{file_id}",
            put(put_article).delete(delete_article).get(get_article),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn put_article(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !state.index.is_ready() {
        return error_response(NewsreelError::NotReady);
    }
    let Some(ttl_secs) = ttl_from_headers(&headers) else {
        return bad_request("missing or malformed Cache-Control max-age header");
    };
    if body.trim().is_empty() {
        return bad_request("empty body");
    }

    let fetch_time = chrono::Utc::now().timestamp().max(0) as u64;

    match state.annotator.annotate(&body, &file_id) {
        Some(mut document) => {
            document.fetch_time = fetch_time;
            document.ttl_secs = ttl_secs;
            match state.store.put(&document) {
                Ok(PutOutcome::Created) => StatusCode::CREATED.into_response(),
                Ok(PutOutcome::Replaced) => StatusCode::NO_CONTENT.into_response(),
                Err(e) => storage_failure(e),
            }
        }
        None if state.skip_irrelevant_docs => {
            // Skipped document: acknowledge with the existence-based status,
            // store nothing.
            match state.store.contains(&file_id) {
                Ok(true) => StatusCode::NO_CONTENT.into_response(),
                Ok(false) => StatusCode::CREATED.into_response(),
                Err(e) => storage_failure(e),
            }
        }
        None => {
            // Keep an existence marker (never news, never clustered) so that
            // replace and delete semantics hold for skipped documents.
            let marker = Document {
                file_id: file_id.clone(),
                url: String::new(),
                host: String::new(),
                title: String::new(),
                pub_time: 0,
                fetch_time,
                ttl_secs,
                language: Language::Undefined,
                category: Category::Undefined,
                embeddings: HashMap::new(),
            };
            match state.store.put(&marker) {
                Ok(PutOutcome::Created) => StatusCode::CREATED.into_response(),
                Ok(PutOutcome::Replaced) => StatusCode::NO_CONTENT.into_response(),
                Err(e) => storage_failure(e),
            }
        }
    }
}

async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Response {
    if !state.index.is_ready() {
        return error_response(NewsreelError::NotReady);
    }
    match state.store.delete(&file_id) {
        Ok(DeleteOutcome::Deleted) => StatusCode::NO_CONTENT.into_response(),
        Ok(DeleteOutcome::Absent) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => storage_failure(e),
    }
}

/// Debug endpoint: what does the store hold for this file id?
async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Response {
    if !state.index.is_ready() {
        return error_response(NewsreelError::NotReady);
    }
    match state.store.get(&file_id) {
        Ok(Some(document)) => Json(json!({
            "file_id": file_id,
            "status": "found",
            "title": document.title,
            "language": document.language,
            "category": document.category,
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "file_id": file_id, "status": "not_found" })),
        )
            .into_response(),
        Err(e) => storage_failure(e),
    }
}

#[derive(Debug, Deserialize)]
struct ThreadsQuery {
    period: Option<String>,
    lang_code: Option<String>,
    category: Option<String>,
}

async fn threads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThreadsQuery>,
) -> Response {
    if !state.index.is_ready() {
        return error_response(NewsreelError::NotReady);
    }
    let Some(period) = query.period.as_deref().and_then(|p| p.parse::<u64>().ok()) else {
        return bad_request("missing or malformed period");
    };
    let Some(language) = query.lang_code.as_deref().and_then(Language::from_code) else {
        return bad_request("lang_code must be one of: ru, en");
    };
    let Some(category) = query.category.as_deref().and_then(Category::from_tag) else {
        return bad_request("unknown category");
    };

    let index = state.index.load_full();
    let ranked = rank(
        index.threads_for(language),
        &state.rating,
        category,
        period,
        index.iter_timestamp,
        &state.ranking,
    );

    let threads: Vec<serde_json::Value> = ranked.iter().map(thread_json).collect();
    Json(json!({ "threads": threads })).into_response()
}

fn thread_json(scored: &ScoredThread<'_>) -> serde_json::Value {
    let articles: Vec<&str> = scored
        .thread
        .documents
        .iter()
        .map(|d| d.file_id.as_str())
        .collect();
    json!({
        "title": scored.thread.title,
        "category": scored.thread.category,
        "articles": articles,
    })
}

/// `Cache-Control: max-age=<seconds>` carries the document TTL.
fn ttl_from_headers(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::CACHE_CONTROL)?.to_str().ok()?;
    parse_max_age(value)
}

fn parse_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age=")?.parse().ok())
}

fn bad_request(message: &str) -> Response {
    error_response(NewsreelError::BadRequest(message.to_string()))
}

fn storage_failure(e: StoreError) -> Response {
    warn!(error = %e, "Storage failure");
    error_response(NewsreelError::Storage(e.to_string()))
}

/// Caller-visible errors translate to HTTP statuses at this boundary;
/// everything recoverable below it never reaches a response.
fn error_response(error: NewsreelError) -> Response {
    let status = match &error {
        NewsreelError::BadRequest(_) => StatusCode::BAD_REQUEST,
        NewsreelError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        NewsreelError::Storage(_)
        | NewsreelError::Annotation(_)
        | NewsreelError::Config(_)
        | NewsreelError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_common::Thread;

    #[test]
    fn parses_max_age_directives() {
        assert_eq!(parse_max_age("max-age=900"), Some(900));
        assert_eq!(parse_max_age("public, max-age=3600"), Some(3600));
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
        assert_eq!(parse_max_age(""), None);
    }

    #[test]
    fn thread_json_shape() {
        let thread = Thread {
            title: "Rates raised".to_string(),
            category: Category::Economy,
            language: Language::En,
            best_time: 100,
            documents: vec![Document {
                file_id: "42".to_string(),
                url: "https://a.com/42".to_string(),
                host: "a.com".to_string(),
                title: "Rates raised".to_string(),
                pub_time: 0,
                fetch_time: 100,
                ttl_secs: 60,
                language: Language::En,
                category: Category::Economy,
                embeddings: HashMap::new(),
            }],
        };
        let scored = ScoredThread {
            thread: &thread,
            weight: 1.0,
            importance: 1.0,
            age_penalty: 1.0,
            score: 1.0,
        };
        let value = thread_json(&scored);
        assert_eq!(value["title"], "Rates raised");
        assert_eq!(value["category"], "economy");
        assert_eq!(value["articles"][0], "42");
    }
}
