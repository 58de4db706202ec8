//! End-to-end checks against real sockets.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};
use tracelink_core::{Credentials, ListenerAddr, Settings};
use tracelink_server::{start, QrCodeRenderer, ServerHandle};
use tracelink_store::EventStore;

const USER: &str = "operator";
const PASS: &str = "lab-password";

struct Running {
    _dir: tempfile::TempDir,
    store: EventStore,
    handle: ServerHandle,
    http: reqwest::Client,
}

impl Running {
    fn capture(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.capture_addr, path)
    }

    fn operator(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.operator_addr, path)
    }
}

async fn launch() -> Running {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.capture = ListenerAddr::new("127.0.0.1", 0);
    settings.operator = ListenerAddr::new("127.0.0.1", 0);
    settings.data_dir = dir.path().to_path_buf();

    let store = EventStore::open(&settings.events_db_path()).unwrap();
    let handle = start(
        &settings,
        store.clone(),
        Credentials::new(USER, SecretString::from(PASS)),
        Arc::new(QrCodeRenderer::default()),
    )
    .await
    .unwrap();

    Running {
        _dir: dir,
        store,
        handle,
        http: reqwest::Client::builder().no_proxy().build().unwrap(),
    }
}

#[tokio::test]
async fn issued_link_is_visited_then_reported() {
    let srv = launch().await;

    let issued: Value = srv
        .http
        .get(srv.operator("/admin/generate"))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session = issued["session"].as_str().unwrap().to_string();
    let visit_url = issued["visit_url"].as_str().unwrap().to_string();
    assert_eq!(
        visit_url,
        format!("http://{}/visit?s={session}", srv.handle.capture_addr)
    );

    let page = srv
        .http
        .get(&visit_url)
        .header("user-agent", "Mozilla/5.0 (test)")
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    assert!(page.text().await.unwrap().contains(&session));

    let reported = srv
        .http
        .post(srv.capture("/report"))
        .json(&json!({"session": session, "payload": {"platform": "Win32"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(reported.status(), 200);

    let events: Value = srv
        .http
        .get(srv.operator(&format!("/admin/logs?session={session}")))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["payload"], json!({"platform": "Win32"}));
    assert_eq!(events[1]["payload"], json!({}));
    assert_eq!(events[1]["ip"], "127.0.0.1");
    assert_eq!(events[1]["ua"], "Mozilla/5.0 (test)");

    assert!(srv.handle.shutdown().await);
}

#[tokio::test]
async fn operator_requires_credentials() {
    let srv = launch().await;

    let resp = srv.http.get(srv.operator("/admin/logs")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(
        resp.headers()["www-authenticate"],
        "Basic realm=\"Operator\""
    );
    assert_eq!(resp.text().await.unwrap(), "Auth required");

    let resp = srv
        .http
        .post(srv.operator("/admin/clear_logs"))
        .basic_auth(USER, Some("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // The capture surface never asks for credentials.
    let resp = srv.http.get(srv.capture("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    srv.handle.shutdown().await;
}

#[tokio::test]
async fn concurrent_reports_all_land_once() {
    let srv = launch().await;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let http = srv.http.clone();
        let url = srv.capture("/report");
        tasks.push(tokio::spawn(async move {
            http.post(url)
                .json(&json!({"session": format!("s{}", i % 7), "payload": {"n": i}}))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    assert_eq!(srv.store.count().unwrap(), 100);
    let events = srv.store.list(200).unwrap();
    let ids: HashSet<i64> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 100);
    let ns: HashSet<i64> = events
        .iter()
        .map(|e| e.payload["n"].as_i64().unwrap())
        .collect();
    assert_eq!(ns, (0..100).collect());

    srv.handle.shutdown().await;
}

#[tokio::test]
async fn malformed_report_leaves_log_untouched() {
    let srv = launch().await;

    let resp = srv
        .http
        .post(srv.capture("/report"))
        .header("content-type", "application/json")
        .body("{\"session\":")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"error": "invalid json"}));
    assert_eq!(srv.store.count().unwrap(), 0);

    srv.handle.shutdown().await;
}
