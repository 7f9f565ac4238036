use anyhow::Result;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bisearch_core::query::{evaluate, parse};
use bisearch_core::{IndexPaths, SearchIndex};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use std::path::Path;
use std::sync::{Arc, Mutex};

const HEADER_LINES: usize = 6;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize {
    20
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub docid: u32,
    pub lang: String,
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

/// Queries are evaluated serially; the mutex also guards the posting-file
/// read position inside the loaded index.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<Mutex<SearchIndex>>,
}

pub fn build_app(index_dir: &Path) -> Result<Router> {
    // Load the index at startup
    let index = SearchIndex::open(&IndexPaths::new(index_dir))?;
    let state = AppState {
        index: Arc::new(Mutex::new(index)),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<axum::http::HeaderValue> =
                val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
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

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:docid", get(doc_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let node = parse(&params.q).map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    let mut ix = state
        .index
        .lock()
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "index lock poisoned".to_string()))?;
    let hits = evaluate(&mut ix, &node)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    let terms: Vec<String> = node.terms().iter().map(|t| t.to_string()).collect();
    let k = params.k.max(1).min(100);
    let mut results: Vec<SearchHit> = Vec::new();
    for &docid in hits.iter().take(k) {
        let hit = match ix.doc(docid) {
            Some(d) => SearchHit {
                docid,
                lang: d.lang.clone(),
                title: d.title.clone(),
                url: d.url.clone(),
                snippet: snippet_from_file(Path::new(&d.path), &terms),
            },
            None => SearchHit {
                docid,
                lang: "?".into(),
                title: "?".into(),
                url: "?".into(),
                snippet: None,
            },
        };
        results.push(hit);
    }

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        total_hits: hits.len(),
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    UrlPath(docid): UrlPath<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let ix = state
        .index
        .lock()
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "index lock poisoned".to_string()))?;
    let Some(d) = ix.doc(docid) else {
        return Err((StatusCode::NOT_FOUND, "not found".to_string()));
    };
    let mut obj = serde_json::json!({
        "docid": docid,
        "lang": d.lang,
        "title": d.title,
        "url": d.url,
        "path": d.path,
    });
    if let Ok(raw) = std::fs::read(&d.path) {
        obj["text"] = serde_json::Value::String(String::from_utf8_lossy(&raw).into_owned());
    }
    Ok(Json(obj))
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Body of a corpus file, past the six metadata lines.
fn body_of(text: &str) -> Option<&str> {
    let mut start = 0;
    for _ in 0..HEADER_LINES {
        match text[start..].find('\n') {
            Some(i) => start += i + 1,
            None => return None,
        }
    }
    Some(&text[start..])
}

fn snippet_from_file(path: &Path, terms: &[String]) -> Option<String> {
    let raw = std::fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&raw);
    let body = body_of(&text)?;
    if body.is_empty() {
        return None;
    }
    // window around the first match of any query term
    let first = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(body, t));
    let snippet = match first {
        Some(idx) => {
            let start = floor_char_boundary(body, idx.saturating_sub(100));
            let end = floor_char_boundary(body, idx + 200);
            body[start..end].to_string()
        }
        None => body.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, terms))
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.to_lowercase();
    let n = needle.to_lowercase();
    h.find(&n).map(|i| floor_char_boundary(haystack, i))
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() {
            continue;
        }
        let Ok(pat) = regex::RegexBuilder::new(&regex::escape(t))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        s = pat.replace_all(&s, "<em>$0</em>").to_string();
    }
    s
}
