use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::tempdir;

use std::fs;
use std::path::Path;

fn write_doc(corpus: &Path, lang_dir: &str, name: &str, title: &str, body: &str) {
    let dir = corpus.join(lang_dir).join("text").join("AA");
    fs::create_dir_all(&dir).unwrap();
    let header = format!(
        "id: {name}\nlang: ?\nTitle: {title}\nURL: http://example.org/{name}\ndate: 2024-01-01\n----\n"
    );
    fs::write(dir.join(name), format!("{header}{body}\n")).unwrap();
}

fn build_tiny_app(tmp: &Path) -> Router {
    let corpus = tmp.join("corpus");
    let index = tmp.join("index");
    write_doc(&corpus, "enwiki", "1.txt", "Rust intro", "rust is fast and safe");
    write_doc(&corpus, "enwiki", "2.txt", "Two langs", "rust and python together");
    write_doc(&corpus, "enwiki", "3.txt", "Python only", "python scripting");
    bisearch_core::builder::build(&corpus, &index, 0).unwrap();
    bisearch_server::build_app(&index).unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_boolean_hits_in_docid_order() {
    let dir = tempdir().unwrap();
    let app = build_tiny_app(dir.path());

    let (status, json) = get(app, "/search?q=rust%20OR%20python&k=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 3);
    let ids: Vec<u64> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["docid"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn negation_excludes_documents() {
    let dir = tempdir().unwrap();
    let app = build_tiny_app(dir.path());

    let (status, json) = get(app, "/search?q=rust%20AND%20NOT%20python&k=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["docid"], 1);
    assert_eq!(json["results"][0]["title"], "Rust intro");
    let snippet = json["results"][0]["snippet"].as_str().unwrap();
    assert!(snippet.contains("<em>rust</em>"));
}

#[tokio::test]
async fn k_truncates_results_but_not_total_hits() {
    let dir = tempdir().unwrap();
    let app = build_tiny_app(dir.path());

    let (status, json) = get(app, "/search?q=rust%20OR%20python&k=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_query_is_bad_request() {
    let dir = tempdir().unwrap();
    let app = build_tiny_app(dir.path());

    let (status, _) = get(app, "/search?q=rust%20python").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn doc_endpoint_serves_the_record() {
    let dir = tempdir().unwrap();
    let app = build_tiny_app(dir.path());

    let (status, json) = get(app.clone(), "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Two langs");
    assert_eq!(json["lang"], "en");
    assert!(json["text"].as_str().unwrap().contains("python together"));

    let (status, _) = get(app, "/doc/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
