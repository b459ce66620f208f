mod common;

use common::*;
use portal_api::auth::{JwksCache, JwksError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cache(server: &MockServer, ttl: Duration, min_refresh_interval: Duration) -> JwksCache {
    JwksCache::new(
        jwks_url(server),
        reqwest::Client::new(),
        ttl,
        min_refresh_interval,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks(vec![primary_jwk()]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(cache(&server, Duration::from_secs(3600), Duration::from_secs(10)));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_key(Some(PRIMARY_KID)).await })
        })
        .collect();

    for handle in handles {
        let key = handle.await.unwrap().unwrap();
        assert_eq!(key.kid.as_deref(), Some(PRIMARY_KID));
    }
}

#[tokio::test]
async fn test_fresh_cache_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk()])))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::from_secs(10));

    assert_eq!(cache.prefetch().await.unwrap(), 1);
    assert!(cache.is_cached().await);
    for _ in 0..3 {
        cache.get_key(Some(PRIMARY_KID)).await.unwrap();
    }
}

#[tokio::test]
async fn test_expired_cache_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk()])))
        .expect(2)
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::ZERO, Duration::from_secs(10));

    cache.get_key_set().await.unwrap();
    cache.get_key_set().await.unwrap();
}

#[tokio::test]
async fn test_unknown_kid_forces_refresh_for_rotation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk()])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk(), rotated_jwk()])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::ZERO);

    cache.get_key(Some(PRIMARY_KID)).await.unwrap();
    let key = cache.get_key(Some(ROTATED_KID)).await.unwrap();

    assert_eq!(key.kid.as_deref(), Some(ROTATED_KID));
}

#[tokio::test]
async fn test_unknown_kid_refresh_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk()])))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::from_secs(3600));

    for _ in 0..3 {
        let err = cache.get_key(Some("unknown")).await.err().unwrap();
        assert!(matches!(err, JwksError::KeyNotFound { ref kid } if kid == "unknown"));
    }
}

#[tokio::test]
async fn test_fetch_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::from_secs(10));

    let err = cache.prefetch().await.unwrap_err();
    assert!(matches!(err, JwksError::FetchFailed { .. }));
    assert!(err.to_string().contains("HTTP 500"));
    assert!(!cache.is_cached().await);
}

#[tokio::test]
async fn test_body_without_keys_is_parse_error() {
    let server = MockServer::start().await;
    mount_jwks(&server, json!({"issuer": "nope"})).await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::from_secs(10));

    assert!(matches!(
        cache.get_key_set().await,
        Err(JwksError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn test_set_without_usable_keys_is_error() {
    let server = MockServer::start().await;
    mount_jwks(
        &server,
        json!({"keys": [{"kty": "RSA", "use": "enc", "alg": "RSA-OAEP", "kid": "enc", "n": PRIMARY_MODULUS, "e": "AQAB"}]}),
    )
    .await;

    let cache = cache(&server, Duration::from_secs(3600), Duration::from_secs(10));

    assert!(matches!(
        cache.get_key_set().await,
        Err(JwksError::NoUsableKeys { .. })
    ));
    assert!(!cache.is_cached().await);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(vec![primary_jwk()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let cache = cache(&server, Duration::ZERO, Duration::from_secs(10));

    cache.get_key_set().await.unwrap();
    assert!(cache.get_key_set().await.is_err());
    assert!(cache.is_cached().await);
}
