//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use cache_engine::{
    create_router, AppState, CacheEngine, CacheError, CacheProvider, CachedItem, Config, EntryOptions,
    ManualClock,
};
use regex::Regex;
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(Config::default()))
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn put_value(app: &Router, body: &str) {
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/set", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"test_key","value":"test_value"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json.get("message").is_some());
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_with_ttl_and_tags() {
    let app = create_test_app();

    put_value(
        &app,
        r#"{"key":"User::1","value":{"name":"ada"},"ttl":60,"tags":["users","t1"]}"#,
    )
    .await;

    let response = app.oneshot(empty_request("GET", "/get/User::1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"]["name"], "ada");
    assert_eq!(json["tags"], serde_json::json!(["t1", "users"]));
    assert!(json["ttl_remaining_ms"].as_u64().unwrap() <= 60_000);
    assert!(json["age_ms"].is_u64());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"get_key","value":"get_value"}"#).await;

    let get_response = app.oneshot(empty_request("GET", "/get/get_key")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"].as_str().unwrap(), "get_key");
    assert_eq!(json["value"].as_str().unwrap(), "get_value");
}

#[tokio::test]
async fn test_get_endpoint_cached_null() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"nullable","value":null}"#).await;

    let response = app.oneshot(empty_request("GET", "/get/nullable")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["value"].is_null());
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/get/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Provider Selection Tests ==

#[tokio::test]
async fn test_provider_selection() {
    let engine = Arc::new(CacheEngine::new(Config::default()));
    engine.create_memory_provider("l1");
    let app = create_router(AppState::new(engine));

    put_value(&app, r#"{"key":"Cfg::A","value":1,"provider":"l1"}"#).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/Cfg::A?provider=l1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Not present in the default provider
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/Cfg::A"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(empty_request("GET", "/providers")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["providers"], serde_json::json!(["l1", "memory"]));
}

#[tokio::test]
async fn test_unknown_provider_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/get/Cfg::A?provider=redis"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("redis"));
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"delete_key","value":"delete_value"}"#).await;

    let del_response = app
        .clone()
        .oneshot(empty_request("DELETE", "/del/delete_key"))
        .await
        .unwrap();
    assert_eq!(del_response.status(), StatusCode::OK);

    // Verify it's gone
    let get_response = app
        .oneshot(empty_request("GET", "/get/delete_key"))
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("DELETE", "/del/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Invalidation Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_by_tags_endpoint() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"User::1","value":1,"tags":["t1"]}"#).await;
    put_value(&app, r#"{"key":"User::2","value":2,"tags":["t2"]}"#).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/invalidate/tags", r#"{"tags":["t1"]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 1);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/User::1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(empty_request("GET", "/get/User::2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalidate_by_pattern_endpoint() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"User::1","value":1}"#).await;
    put_value(&app, r#"{"key":"User::2","value":2}"#).await;
    put_value(&app, r#"{"key":"Order::1","value":3}"#).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/invalidate/pattern",
            r#"{"pattern":"User::*"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);

    let response = app.oneshot(empty_request("GET", "/get/Order::1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalidate_by_malformed_pattern() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"User::1","value":1}"#).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/invalidate/pattern",
            r#"{"pattern":"User::("}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("User::("));

    let response = app.oneshot(empty_request("GET", "/get/User::1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"User::1","value":"stats_value"}"#).await;

    // Get (hit)
    let _ = app
        .clone()
        .oneshot(empty_request("GET", "/get/User::1"))
        .await
        .unwrap();

    // Get (miss)
    let _ = app
        .clone()
        .oneshot(empty_request("GET", "/get/Order::9"))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    assert_eq!(json["total_hits"].as_u64().unwrap(), 1);
    assert_eq!(json["total_misses"].as_u64().unwrap(), 1);
    assert_eq!(json["total_sets"].as_u64().unwrap(), 1);
    assert_eq!(json["active_keys_count"].as_u64().unwrap(), 1);
    assert_eq!(json["hit_ratio"].as_f64().unwrap(), 0.5);
    assert_eq!(json["category_stats"]["User"]["hits"], 1);
    assert_eq!(json["category_stats"]["Order"]["misses"], 1);
}

#[tokio::test]
async fn test_stats_reset_endpoint() {
    let app = create_test_app();
    put_value(&app, r#"{"key":"User::1","value":1}"#).await;

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/stats/reset"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_sets"], 0);
    assert_eq!(json["active_keys_count"], 1);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/set", r#"{"invalid json"#))
        .await
        .unwrap();

    // Axum returns 422 for JSON parsing errors by default
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/set", r#"{"key":"","value":"test"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let clock = Arc::new(ManualClock::new());
    let engine = Arc::new(CacheEngine::with_clock(Config::default(), clock.clone()));
    let app = create_router(AppState::new(engine));

    put_value(&app, r#"{"key":"ttl_test","value":"expires_soon","ttl":1}"#).await;

    // Verify it exists immediately
    let get_response = app
        .clone()
        .oneshot(empty_request("GET", "/get/ttl_test"))
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);

    clock.advance(Duration::from_millis(1100));

    // Verify it's expired
    let get_response = app
        .oneshot(empty_request("GET", "/get/ttl_test"))
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

// == External Provider Failure Tests ==

/// Provider whose backend is always down.
#[derive(Debug)]
struct UnreachableProvider;

impl UnreachableProvider {
    fn down<T>() -> cache_engine::Result<T> {
        Err(CacheError::Provider("remote backend unreachable".to_string()))
    }
}

#[async_trait]
impl CacheProvider for UnreachableProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn get(&self, _key: &str) -> cache_engine::Result<Option<CachedItem>> {
        Self::down()
    }

    async fn set(&self, _key: &str, _value: Value, _options: EntryOptions) -> cache_engine::Result<()> {
        Self::down()
    }

    async fn remove(&self, _key: &str) -> cache_engine::Result<bool> {
        Self::down()
    }

    async fn invalidate_by_tags(&self, _tags: &[String]) -> cache_engine::Result<usize> {
        Self::down()
    }

    async fn invalidate_by_pattern(&self, _pattern: &Regex) -> cache_engine::Result<usize> {
        Self::down()
    }

    async fn clear(&self) -> cache_engine::Result<usize> {
        Self::down()
    }

    async fn len(&self) -> cache_engine::Result<usize> {
        Self::down()
    }
}

#[tokio::test]
async fn test_provider_backend_failure_returns_503() {
    let engine = Arc::new(CacheEngine::new(Config::default()));
    engine.register_cache_provider("remote", Arc::new(UnreachableProvider));
    let app = create_router(AppState::new(engine));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/User::1?provider=remote"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("remote backend unreachable"));

    let response = app
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"User::1","value":1,"provider":"remote"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
