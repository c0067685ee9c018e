//! Integration tests against an in-process mock filer
//!
//! The mock speaks the wire protocol the client expects: JSON directory
//! listings, header-carried TTL and extended metadata, idempotent deletes.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::json;

use seaweed_filer::{
    Blob, BlobMetadata, ByteStream, Catalog, FilerError, FilerStore, TransferProgress, Ttl,
    UploadOptions,
};

#[derive(Clone)]
struct StoredBlob {
    data: Vec<u8>,
    ttl_sec: u64,
    extended: BTreeMap<String, Vec<String>>,
    crtime: DateTime<Utc>,
}

type FilerState = Arc<Mutex<BTreeMap<String, StoredBlob>>>;

async fn handle_get(Path(path): Path<String>, State(state): State<FilerState>) -> Response {
    let full = format!("/{path}");
    if full.ends_with('/') {
        let dir = full.trim_end_matches('/').to_string();
        let entries: Vec<serde_json::Value> = state
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(&format!("{dir}/")))
            .map(|(key, blob)| {
                json!({
                    "FullPath": key,
                    "FileSize": blob.data.len(),
                    "Crtime": blob.crtime.to_rfc3339(),
                    "TtlSec": blob.ttl_sec,
                    "Extended": blob.extended,
                })
            })
            .collect();
        let entries = if entries.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::Array(entries)
        };
        return Json(json!({"Path": dir, "Entries": entries, "Limit": 100})).into_response();
    }

    let guard = state.lock().unwrap();
    let Some(blob) = guard.get(&full) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, blob.data.len())
        .header(header::LAST_MODIFIED, blob.crtime.to_rfc2822());
    if blob.ttl_sec > 0 {
        response = response.header("seaweed-ttl", blob.ttl_sec);
    }
    for (key, values) in &blob.extended {
        for value in values {
            response = response.header(key.as_str(), value.as_str());
        }
    }
    response.body(Body::from(blob.data.clone())).unwrap()
}

async fn handle_put(
    Path(path): Path<String>,
    State(state): State<FilerState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let full = format!("/{path}");
    if full.ends_with("reject.txt") {
        return (StatusCode::INSUFFICIENT_STORAGE, "quota exceeded").into_response();
    }

    let Ok(data) = axum::body::to_bytes(body, usize::MAX).await else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "body read failed").into_response();
    };

    let ttl_sec = headers
        .get("seaweed-ttl")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut extended: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        if name.as_str().starts_with("seaweed-ext-") {
            if let Ok(value) = value.to_str() {
                extended
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }

    let size = data.len();
    let name = full.rsplit('/').next().unwrap().to_string();
    state.lock().unwrap().insert(
        full,
        StoredBlob {
            data: data.to_vec(),
            ttl_sec,
            extended,
            crtime: Utc::now(),
        },
    );
    (StatusCode::CREATED, Json(json!({"name": name, "size": size}))).into_response()
}

async fn handle_delete(Path(path): Path<String>, State(state): State<FilerState>) -> StatusCode {
    let full = format!("/{path}");
    if state.lock().unwrap().remove(&full).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn start_mock_filer() -> (String, FilerState) {
    let state: FilerState = Arc::new(Mutex::new(BTreeMap::new()));
    let app = Router::new()
        .route(
            "/{*path}",
            get(handle_get).put(handle_put).delete(handle_delete),
        )
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn catalog_at(base: &str, prefix: &str) -> Catalog {
    FilerStore::new(base).unwrap().get_catalog(prefix).unwrap()
}

fn owner_blob(payload: &'static [u8]) -> Blob {
    let (metadata, content) = Blob::from_bytes("a.txt", payload).unwrap().into_parts();
    let metadata = metadata
        .with_ttl(Ttl::days(7))
        .with_header("owner", "u1")
        .unwrap();
    Blob::new(metadata, content)
}

async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

fn assert_progress_shape(seen: &[u8]) {
    assert!(!seen.is_empty(), "expected progress updates");
    assert!(
        seen.windows(2).all(|w| w[0] < w[1]),
        "progress must be strictly increasing: {seen:?}"
    );
    assert_eq!(*seen.last().unwrap(), 100);
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);
}

#[tokio::test]
async fn push_then_get_round_trips_bytes_and_metadata() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;
    let payload = b"0123456789";

    let (progress, mut updates) = TransferProgress::channel();
    let confirmed = catalog
        .push(owner_blob(payload), Some(progress), UploadOptions::new())
        .await
        .unwrap();
    assert_eq!(confirmed.name, "a.txt");
    assert_eq!(confirmed.file_size, 10);
    assert_eq!(confirmed.ttl, Ttl::seconds(604800));
    assert!(confirmed.created_at.is_some());
    assert_progress_shape(&updates.drain());

    let blob = catalog.get("a.txt", None).await.unwrap();
    let metadata = blob.metadata().clone();
    assert_eq!(metadata.file_size, 10);
    assert_eq!(metadata.ttl, Ttl::seconds(604800));
    assert_eq!(metadata.extended["owner"], vec!["u1"]);
    assert!(metadata.created_at.is_some());

    assert_eq!(read_all(blob.into_content()).await, payload);
}

#[tokio::test]
async fn list_reflects_pushed_blob() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    catalog
        .push(owner_blob(b"0123456789"), None, UploadOptions::new())
        .await
        .unwrap();

    let entries = catalog.list().await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.name, "a.txt");
    assert_eq!(entry.file_size, 10);
    assert_eq!(entry.ttl, Ttl::days(7));
    assert_eq!(entry.extended["owner"], vec!["u1"]);
    assert!(entry.created_at.is_some());
}

#[tokio::test]
async fn list_on_empty_prefix_returns_empty_sequence() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/empty").await;
    assert!(catalog.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_on_missing_name_is_not_found() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;
    let err = catalog.get("missing.txt", None).await.unwrap_err();
    match err {
        FilerError::NotFound { name } => assert_eq!(name, "missing.txt"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    catalog
        .push(owner_blob(b"0123456789"), None, UploadOptions::new())
        .await
        .unwrap();
    catalog.delete("a.txt").await.unwrap();
    assert!(matches!(
        catalog.get("a.txt", None).await,
        Err(FilerError::NotFound { .. })
    ));
    catalog.delete("a.txt").await.unwrap();

    // never-pushed names delete cleanly twice as well
    catalog.delete("missing.txt").await.unwrap();
    catalog.delete("missing.txt").await.unwrap();
}

#[tokio::test]
async fn push_progress_is_monotonic_for_chunked_payload() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let chunks: Vec<Result<Bytes, std::io::Error>> = (0..4)
        .map(|_| Ok(Bytes::from(vec![7u8; 25])))
        .collect();
    let content: ByteStream = Box::pin(futures::stream::iter(chunks));
    let metadata = BlobMetadata::new("chunked.bin").unwrap().with_size_hint(100);
    let blob = Blob::new(metadata, content);

    let (progress, mut updates) = TransferProgress::channel();
    let confirmed = catalog
        .push(blob, Some(progress), UploadOptions::new())
        .await
        .unwrap();
    assert_eq!(confirmed.file_size, 100);

    let seen = updates.drain();
    assert_progress_shape(&seen);
    // intermediate updates stay below 100 until the store confirms
    assert!(seen[..seen.len() - 1].iter().all(|&p| p < 100), "{seen:?}");
}

#[tokio::test]
async fn download_progress_reaches_100_once_drained() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;
    catalog
        .push(owner_blob(b"0123456789"), None, UploadOptions::new())
        .await
        .unwrap();

    let (progress, mut updates) = TransferProgress::channel();
    let blob = catalog.get("a.txt", Some(progress)).await.unwrap();
    assert!(updates.drain().is_empty(), "no progress before consumption");

    read_all(blob.into_content()).await;
    assert_progress_shape(&updates.drain());
}

#[tokio::test]
async fn empty_blob_download_still_reports_completion() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let blob = Blob::from_bytes("zero.txt", &b""[..]).unwrap();
    catalog.push(blob, None, UploadOptions::new()).await.unwrap();

    let (progress, mut updates) = TransferProgress::channel();
    let blob = catalog.get("zero.txt", Some(progress)).await.unwrap();
    assert_eq!(blob.metadata().file_size, 0);

    assert!(read_all(blob.into_content()).await.is_empty());
    // Content-Length of zero is a known total, not a missing one
    assert_eq!(updates.drain(), vec![100]);
}

#[tokio::test]
async fn aborted_push_leaves_no_listable_entry() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"first chunk")),
        Err(std::io::Error::other("disk gone")),
    ];
    let content: ByteStream = Box::pin(futures::stream::iter(chunks));
    let metadata = BlobMetadata::new("broken.bin").unwrap().with_size_hint(4096);
    let blob = Blob::new(metadata, content);

    let (progress, mut updates) = TransferProgress::channel();
    let err = catalog
        .push(blob, Some(progress), UploadOptions::new())
        .await
        .unwrap_err();
    match err {
        FilerError::WriteAborted { reason } => assert!(reason.contains("disk gone")),
        other => panic!("expected WriteAborted, got {other:?}"),
    }

    assert!(
        !updates.drain().contains(&100),
        "failed transfer must not claim completion"
    );
    assert!(catalog.list().await.unwrap().is_empty());
    assert!(matches!(
        catalog.get("broken.bin", None).await,
        Err(FilerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn upload_options_ttl_overrides_metadata() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let blob = Blob::from_bytes("short.txt", &b"abc"[..]).unwrap();
    let confirmed = catalog
        .push(blob, None, UploadOptions::new().with_ttl(Ttl::hours(1)))
        .await
        .unwrap();
    assert_eq!(confirmed.ttl, Ttl::seconds(3600));

    let fetched = catalog.get("short.txt", None).await.unwrap();
    assert_eq!(fetched.metadata().ttl, Ttl::hours(1));
}

#[tokio::test]
async fn infinite_ttl_round_trips_and_displays_as_infinite() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let blob = Blob::from_bytes("forever.txt", &b"abc"[..]).unwrap();
    let confirmed = catalog.push(blob, None, UploadOptions::new()).await.unwrap();
    assert!(confirmed.ttl.is_infinite());

    let fetched = catalog.get("forever.txt", None).await.unwrap();
    assert!(fetched.metadata().ttl.is_infinite());
    assert_eq!(fetched.metadata().ttl.to_string(), "infinite");
}

#[tokio::test]
async fn server_rejection_surfaces_status_and_message() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let blob = Blob::from_bytes("reject.txt", &b"abc"[..]).unwrap();
    let err = catalog
        .push(blob, None, UploadOptions::new())
        .await
        .unwrap_err();
    match err {
        FilerError::ServerRejected { status, message } => {
            assert_eq!(status, 507);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_is_distinct_and_retriable() {
    // nothing listens here; connection is refused
    let catalog = catalog_at("http://127.0.0.1:9", "/documents").await;
    let err = catalog.list().await.unwrap_err();
    assert!(matches!(err, FilerError::Transport { .. }));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn invalid_names_fail_fast_without_io() {
    // unreachable store: a validation failure must return before any dial
    let catalog = catalog_at("http://127.0.0.1:9", "/documents").await;

    assert!(matches!(
        catalog.get("../escape.txt", None).await,
        Err(FilerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        catalog.delete("").await,
        Err(FilerError::InvalidArgument { .. })
    ));

    let mut metadata = BlobMetadata::new("ok.txt").unwrap();
    metadata.name = "../escape.txt".to_string();
    let content: ByteStream = Box::pin(futures::stream::empty());
    assert!(matches!(
        catalog.push(Blob::new(metadata, content), None, UploadOptions::new()).await,
        Err(FilerError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn concurrent_pushes_to_different_names_share_one_catalog() {
    let (base, _state) = start_mock_filer().await;
    let catalog = catalog_at(&base, "/documents").await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            let blob = Blob::from_bytes(format!("f{i}.txt"), vec![i as u8; 64]).unwrap();
            catalog.push(blob, None, UploadOptions::new()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut names: Vec<String> = catalog
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["f0.txt", "f1.txt", "f2.txt", "f3.txt"]);
}
