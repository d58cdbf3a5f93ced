use std::sync::Arc;

use anylabeling_config::Settings;
use anylabeling_gateway::{BindOptions, GatewayServer, HealthStatus, ModelCatalog, ServeExit};
use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Start the gateway on a random port and return its base URL plus a stop handle.
async fn start_test_gateway(
    catalog: Arc<ModelCatalog>,
) -> (String, oneshot::Sender<()>, JoinHandle<ServeExit>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let port = listener.local_addr().unwrap().port();

    let bind = BindOptions {
        host: "127.0.0.1".into(),
        port,
        workers: 1,
        reload: false,
    };
    let server = GatewayServer::new(Arc::new(Settings::default()), bind, catalog);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stop_rx.await;
                ServeExit::Shutdown
            })
            .await
            .expect("server should run")
    });

    (format!("http://127.0.0.1:{port}"), stop_tx, handle)
}

#[tokio::test]
async fn health_reports_loaded_models() {
    let catalog = Arc::new(ModelCatalog::new());
    for id in ["yolov8n", "sam2_hiera_tiny", "rtdetr_r50"] {
        catalog.insert(id);
    }
    let (base, stop, handle) = start_test_gateway(catalog).await;

    let resp = reqwest::get(format!("{base}/health")).await.expect("request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: HealthStatus = resp.json().await.expect("json body");
    assert_eq!(body.status, "healthy");
    assert_eq!(body.models_loaded, 3);
    assert!(body.timestamp.ends_with('Z'));

    let _ = stop.send(());
    assert_eq!(handle.await.unwrap(), ServeExit::Shutdown);
}

#[tokio::test]
async fn health_follows_model_loader_changes() {
    let catalog = Arc::new(ModelCatalog::new());
    let (base, stop, handle) = start_test_gateway(catalog.clone()).await;
    let url = format!("{base}/health");

    let first: HealthStatus = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(first.models_loaded, 0);

    catalog.insert("depth_anything_v2");
    let second: HealthStatus = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(second.models_loaded, 1);

    let _ = stop.send(());
    handle.await.unwrap();
}

#[tokio::test]
async fn concurrent_health_queries_all_succeed() {
    let catalog = Arc::new(ModelCatalog::new());
    catalog.insert("yolov8n");
    let (base, stop, handle) = start_test_gateway(catalog.clone()).await;
    let client = reqwest::Client::new();

    let requests = (0..16).map(|i| {
        let client = client.clone();
        let url = format!("{base}/health");
        let catalog = catalog.clone();
        async move {
            catalog.insert(format!("model-{i}"));
            let resp = client.get(url).send().await.expect("request");
            assert!(resp.status().is_success());
            resp.json::<HealthStatus>().await.expect("json body")
        }
    });
    let statuses = join_all(requests).await;

    assert_eq!(statuses.len(), 16);
    for status in &statuses {
        assert_eq!(status.status, "healthy");
        assert!(status.models_loaded >= 1 && status.models_loaded <= 17);
    }

    let _ = stop.send(());
    handle.await.unwrap();
}
