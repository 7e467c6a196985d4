use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quantboard_firestore::{ClientConfig, CollectionPath, FirestoreClient, FirestoreError};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn doc(id: &str, name: &str) -> Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/quant_strategies/{id}"),
        "fields": {
            "Strategy_Name": { "stringValue": name },
            "Performance_Metrics": { "mapValue": { "fields": { "Sharpe_Ratio": { "doubleValue": 0.7 } } } }
        },
        "updateTime": "2024-01-01T00:00:00Z"
    })
}

/// Serves the collection as two pages for the first `good_listings`
/// listings, then answers 500. Returns the address and every request head.
async fn serve(good_listings: usize) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let first_pages = Arc::new(AtomicUsize::new(0));
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            let first_pages = Arc::clone(&first_pages);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let request_line = head.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push(head);
                let (status, body) = if request_line.contains("pageToken=p2") {
                    ("200 OK", json!({ "documents": [doc("b", "Beta")] }))
                } else if first_pages.fetch_add(1, Ordering::SeqCst) < good_listings {
                    ("200 OK", json!({ "documents": [doc("a", "Alpha")], "nextPageToken": "p2" }))
                } else {
                    ("500 Internal Server Error", json!({ "error": { "code": 500, "message": "boom" } }))
                };
                let body = body.to_string();
                let resp = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    (addr.to_string(), seen)
}

fn client(host: String) -> FirestoreClient {
    let mut cfg = ClientConfig::new("demo");
    cfg.emulator_host = Some(host);
    cfg.page_size = 1;
    cfg.max_retries = 0;
    FirestoreClient::new(cfg).unwrap()
}

fn path() -> CollectionPath {
    "quant_strategies".parse().unwrap()
}

#[tokio::test]
async fn listing_follows_page_tokens() {
    let (host, seen) = serve(1).await;
    let listing = client(host).list_documents(&path()).await.expect("two pages");
    let ids: Vec<&str> = listing.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(listing[0].fields["Performance_Metrics"], json!({ "Sharpe_Ratio": 0.7 }));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("/v1/projects/demo/databases/(default)/documents/quant_strategies?pageSize=1 "));
    assert!(!seen[0].contains("pageToken"));
    assert!(seen[1].contains("pageToken=p2"));
    assert!(seen.iter().all(|h| h.to_ascii_lowercase().contains("authorization: bearer owner")));
}

#[tokio::test]
async fn poll_reports_changes_only_and_surfaces_server_errors() {
    let (host, _seen) = serve(2).await;
    let mut watcher = client(host).watcher(path(), Duration::from_millis(50));

    let first = watcher.poll().await.expect("first poll").expect("first listing is a change");
    assert_eq!(first.len(), 2);
    // same documents, same update times
    assert!(watcher.poll().await.expect("second poll").is_none());

    match watcher.poll().await {
        Err(FirestoreError::Status { status: 500, body }) => assert!(body.contains("boom")),
        other => panic!("expected a 500, got {other:?}"),
    }
}

#[tokio::test]
async fn run_returns_the_error_that_ends_it() {
    let (host, _seen) = serve(1).await;
    let mut watcher = client(host).watcher(path(), Duration::from_millis(20));
    assert!(watcher.poll().await.unwrap().is_some());

    let mut delivered = 0usize;
    let mut on_change = |_listing: quantboard_core::Listing| delivered += 1;
    let res = tokio::time::timeout(Duration::from_secs(5), watcher.run(&mut on_change))
        .await
        .expect("run ends on the failing poll");
    assert!(matches!(res, Err(FirestoreError::Status { status: 500, .. })));
    assert_eq!(delivered, 0);
}
