//! API Integration Tests for the HTTP bridge
//!
//! Exercises every bridge endpoint over a real socket.

use std::sync::Arc;

use adengine::server::{AppState, create_router};
use adengine::{
    AdRecord, Engine, EngineSettings, LoadedFeed, MemorySink, SelectionMode, SinkBatch,
};
use axum::body::Body;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

async fn create_engine(sink: MemorySink) -> Engine {
    let engine = Engine::builder()
        .settings(EngineSettings {
            slots: 2,
            selection: SelectionMode::RoundRobin,
            ..EngineSettings::default()
        })
        .sink(Arc::new(sink))
        .build()
        .await;
    engine
        .set_inventory(LoadedFeed {
            ads: vec![
                AdRecord::new("https://a.example", "A").with_sponsor("Sponsor A", "#"),
                AdRecord::new("https://b.example", "B").with_sponsor("Sponsor B", "#"),
                AdRecord::new("https://c.example", "C").with_sponsor("Sponsor A", "#"),
            ],
            rotation_interval: 0,
        })
        .await;
    engine
}

/// Start test server and return base URL.
async fn start_test_server(engine: Engine) -> String {
    let router = create_router(AppState { engine });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn parse_json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn placement_ids(body: &Value) -> Vec<u64> {
    body["slots"]
        .as_array()
        .expect("slots array")
        .iter()
        .filter_map(|slot| slot["id"].as_u64())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_health_probe() {
    let base_url = start_test_server(create_engine(MemorySink::new()).await).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/healthz", base_url))
        .send()
        .await
        .expect("Failed to send healthz request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse healthz response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "running");
}

#[tokio::test]
async fn test_render_and_slots() {
    let base_url = start_test_server(create_engine(MemorySink::new()).await).await;
    let client = reqwest::Client::new();

    let before: Value = client
        .get(format!("{}/api/slots", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["visible"], true);
    assert!(placement_ids(&before).is_empty());

    let rendered: Value = client
        .post(format!("{}/api/render", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids = placement_ids(&rendered);
    assert_eq!(ids.len(), 2);
    assert_ne!(rendered["slots"][0]["ad"]["id"], rendered["slots"][1]["ad"]["id"]);

    let after: Value = client
        .get(format!("{}/api/slots", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(placement_ids(&after), ids);
}

#[tokio::test]
async fn test_engagement_round_trip() {
    let sink = MemorySink::new();
    let base_url = start_test_server(create_engine(sink.clone()).await).await;
    let client = reqwest::Client::new();

    let rendered: Value = client
        .post(format!("{}/api/render", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids = placement_ids(&rendered);

    for id in &ids {
        let resp = client
            .post(format!("{}/api/placements/{}/visibility", base_url, id))
            .json(&json!({ "ratio": 0.75 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["outcome"], "applied");
    }

    let click = client
        .post(format!("{}/api/placements/{}/click", base_url, ids[0]))
        .send()
        .await
        .unwrap();
    let click: Value = click.json().await.unwrap();
    assert_eq!(click["outcome"], "applied");

    let repeat: Value = client
        .post(format!("{}/api/placements/{}/click", base_url, ids[0]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(repeat["outcome"], "ignored");

    let report: Value = client
        .get(format!("{}/api/report", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["pending"]["impressions"], 2);
    assert_eq!(report["pending"]["clicks"], 1);
    assert_eq!(report["pending"]["sponsors"], 2);

    let flushed: Value = client
        .post(format!("{}/api/flush", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(flushed["calls"], 3);
    assert_eq!(sink.calls(), 3);
    assert!(sink
        .batches()
        .iter()
        .any(|b| matches!(b, SinkBatch::Impressions(items) if items.len() == 2)));
}

#[tokio::test]
async fn test_stale_and_invalid_placements() {
    let base_url = start_test_server(create_engine(MemorySink::new()).await).await;
    let client = reqwest::Client::new();

    let first: Value = client
        .post(format!("{}/api/render", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let old_id = placement_ids(&first)[0];

    // A second pass replaces every placement.
    client
        .post(format!("{}/api/render", base_url))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/placements/{}/visibility", base_url, old_id))
        .json(&json!({ "ratio": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{}/api/placements/not-a-number/click", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_page_visibility_flushes() {
    let sink = MemorySink::new();
    let engine = create_engine(sink.clone()).await;
    let base_url = start_test_server(engine.clone()).await;
    let client = reqwest::Client::new();

    let slots = engine.render_all().await;
    let placement = slots[0].clone().unwrap();
    engine.activate(placement.id).await;

    let resp = client
        .post(format!("{}/api/page", base_url))
        .json(&json!({ "visible": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(sink.calls(), 1);

    let slots: Value = client
        .get(format!("{}/api/slots", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(slots["visible"], false);
}

#[tokio::test]
async fn test_permanent_dismiss_over_http() {
    let engine = create_engine(MemorySink::new()).await;
    let router = create_router(AppState {
        engine: engine.clone(),
    });
    let slots = engine.render_all().await;
    let placement = slots[0].clone().unwrap();

    use tower::ServiceExt;
    let response = router
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri(format!("/api/placements/{}/dismiss", placement.id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"permanent": true}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["outcome"], "applied");

    for _ in 0..4 {
        let slots = engine.render_all().await;
        assert!(
            slots
                .iter()
                .flatten()
                .all(|p| p.ad.id != placement.ad.id)
        );
    }
}
