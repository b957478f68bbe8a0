//! End-to-end tests for the registry HTTP surface.

use corpreg_core::{Company, DurableLog, IndexedStore};
use corpreg_server::{RegistryServer, ServerConfig};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    base: String,
    store: Arc<IndexedStore>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap();
    }
}

async fn start(server: RegistryServer) -> Running {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let store = Arc::clone(server.store());
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });

    Running {
        base,
        store,
        stop,
        handle,
    }
}

async fn start_in_memory() -> Running {
    start(RegistryServer::with_store(
        ServerConfig::default(),
        Arc::new(IndexedStore::in_memory()),
    ))
    .await
}

async fn start_on_file(path: &Path) -> Running {
    start(RegistryServer::open(ServerConfig::default().with_data_file(path)).unwrap()).await
}

async fn list(client: &reqwest::Client, base: &str) -> Vec<Company> {
    let response = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

#[tokio::test]
async fn add_list_delete() {
    let running = start_in_memory().await;
    let client = reqwest::Client::new();
    let base = running.base.clone();

    assert!(list(&client, &base).await.is_empty());

    let response = client
        .post(format!("{base}/add"))
        .json(&Company::new("acme", "7701", "555", "1 Main St", "false"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    client
        .post(format!("{base}/add"))
        .json(&Company::new("globex", "7702", "556", "2 Side St", "true"))
        .send()
        .await
        .unwrap();

    let listed = list(&client, &base).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "acme");
    assert_eq!(listed[1].tax_id, "7702");

    let response = client
        .post(format!("{base}/delete"))
        .form(&[("id", "7701")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = list(&client, &base).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "globex");

    running.shutdown().await;
}

#[tokio::test]
async fn list_uses_wire_field_names() {
    let running = start_in_memory().await;
    running
        .store
        .upsert(Company::new("acme", "7701", "555", "Main", "false"))
        .unwrap();

    let body: serde_json::Value = reqwest::get(format!("{}/", running.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        serde_json::json!([{
            "name": "acme",
            "inn": "7701",
            "phone": "555",
            "address": "Main",
            "individual": "false"
        }])
    );

    running.shutdown().await;
}

#[tokio::test]
async fn delete_without_id_is_bad_request() {
    let running = start_in_memory().await;
    let client = reqwest::Client::new();

    let empty = client
        .post(format!("{}/delete", running.base))
        .form(&[("id", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let missing = client
        .post(format!("{}/delete", running.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    running.shutdown().await;
}

#[tokio::test]
async fn delete_accepts_query_id() {
    let running = start_in_memory().await;
    running
        .store
        .upsert(Company::new("acme", "7701", "", "", ""))
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/delete?id=acme", running.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(running.store.is_empty());

    running.shutdown().await;
}

#[tokio::test]
async fn add_rejects_bad_payloads() {
    let running = start_in_memory().await;
    let client = reqwest::Client::new();

    let malformed = client
        .post(format!("{}/add", running.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let nameless = client
        .post(format!("{}/add", running.base))
        .json(&serde_json::json!({ "inn": "7701" }))
        .send()
        .await
        .unwrap();
    assert_eq!(nameless.status(), StatusCode::BAD_REQUEST);

    client
        .post(format!("{}/add", running.base))
        .json(&Company::new("acme", "7701", "", "", ""))
        .send()
        .await
        .unwrap();
    let conflict = client
        .post(format!("{}/add", running.base))
        .json(&Company::new("globex", "7701", "", "", ""))
        .send()
        .await
        .unwrap();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    assert_eq!(running.store.len(), 1);
    running.shutdown().await;
}

#[tokio::test]
async fn add_accepts_json_without_content_type() {
    let running = start_in_memory().await;

    let response = reqwest::Client::new()
        .post(format!("{}/add", running.base))
        .body(r#"{"name":"acme","inn":"7701","phone":"555","address":"Main","individual":"false"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(running.store.get("7701").unwrap().name, "acme");

    let form_encoded = reqwest::Client::new()
        .post(format!("{}/add", running.base))
        .form(&[("name", "globex")])
        .send()
        .await
        .unwrap();
    assert_eq!(form_encoded.status(), StatusCode::BAD_REQUEST);
    assert_eq!(running.store.len(), 1);

    running.shutdown().await;
}

#[tokio::test]
async fn writes_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companies.csv");
    let client = reqwest::Client::new();

    let running = start_on_file(&path).await;
    for (name, inn) in [("acme", "1"), ("globex", "2"), ("initech", "3")] {
        client
            .post(format!("{}/add", running.base))
            .json(&Company::new(name, inn, "555", "Main", "false"))
            .send()
            .await
            .unwrap();
    }
    client
        .post(format!("{}/delete", running.base))
        .form(&[("id", "globex")])
        .send()
        .await
        .unwrap();
    // Deletes reach the file with the next write-through.
    client
        .post(format!("{}/add", running.base))
        .json(&Company::new("acme", "1", "999", "Main", "false"))
        .send()
        .await
        .unwrap();
    running.shutdown().await;

    let log = DurableLog::open_file(&path).unwrap();
    let names: Vec<_> = log
        .load_all()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["acme", "initech"]);

    let running = start_on_file(&path).await;
    let listed = list(&client, &running.base).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].phone, "999");
    running.shutdown().await;
}
