mod common;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;

use taskgate::app::worker;
use taskgate::config::WorkerConfig;
use taskgate::repos::MemoryStore;
use taskgate::services::executor::ExecutorPool;
use taskgate::services::version::VERSION;

use common::*;

async fn start_server(store: &MemoryStore) -> SocketAddr {
    let server = build_server(store).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

async fn start_worker(config: WorkerConfig) -> SocketAddr {
    let listener = TcpListener::bind(config.listen_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let pool = ExecutorPool::new(config.pool_size);
        worker::serve(&config, pool, listener).await
    });
    addr
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn worker_health(addr: SocketAddr) -> (u16, Value) {
    let res = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn worker_registers_its_bound_port() {
    let store = MemoryStore::new();
    let server = start_server(&store).await;
    let worker = start_worker(worker_config(&format!("http://{server}"), &[])).await;

    let hosts_store = &store;
    assert!(eventually(move || async move { !hosts_store.hosts().is_empty() }).await);

    let hosts = store.hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].ip, "127.0.0.1");
    assert_eq!(hosts[0].port, worker.port());
    assert_eq!(hosts[0].version, VERSION);

    assert!(
        eventually(move || async move { worker_health(worker).await.1["registration"]["state"] == "healthy" })
            .await
    );
}

#[tokio::test]
async fn worker_stays_healthy_while_registration_fails() {
    // Nothing listens on port 1.
    let config = worker_config(
        "http://127.0.0.1:1",
        &[("REGISTRY_MAX_ATTEMPTS", "3")],
    );
    let worker = start_worker(config).await;

    let (status, body) = worker_health(worker).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    assert!(
        eventually(move || async move { worker_health(worker).await.1["registration"]["state"] == "failed" })
            .await
    );
    let (status, body) = worker_health(worker).await;
    assert_eq!(status, 200);
    assert_eq!(body["registration"]["attempts"], 3);
}

#[tokio::test]
async fn wrong_cluster_secret_is_refused() {
    let store = MemoryStore::new();
    let server = start_server(&store).await;
    let worker = start_worker(worker_config(
        &format!("http://{server}"),
        &[("CLUSTER_SECRET", "not-the-secret"), ("REGISTRY_MAX_ATTEMPTS", "2")],
    ))
    .await;

    assert!(
        eventually(move || async move { worker_health(worker).await.1["registration"]["state"] == "failed" })
            .await
    );
    assert!(store.hosts().is_empty());
}

#[tokio::test]
async fn registry_endpoint_requires_cluster_token() {
    let store = MemoryStore::new();
    let server = start_server(&store).await;
    let url = format!("http://{server}/internal/v1/host/registry");
    let client = reqwest::Client::new();

    let res = client
        .post(&url)
        .json(&serde_json::json!({"version": "1.0.0", "port": 9100}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .post(&url)
        .header("x-cluster-token", CLUSTER_SECRET)
        .json(&serde_json::json!({"version": "", "port": 9100}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    assert!(store.hosts().is_empty());

    let res = client
        .post(&url)
        .header("x-cluster-token", CLUSTER_SECRET)
        .json(&serde_json::json!({"version": "1.0.0", "port": 9100}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(store.hosts()[0].addr, "127.0.0.1:9100");
}
