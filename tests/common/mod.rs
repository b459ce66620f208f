//! Shared fixtures for integration tests: RSA signing keys, JWKS bodies,
//! token signing, and app wiring against a wiremock identity provider.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use portal_api::{config::Config, web, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PRIMARY_KID: &str = "primary-key";
pub const ROTATED_KID: &str = "rotated-key";

pub const PRIMARY_PEM: &[u8] = include_bytes!("../fixtures/signing_key_primary.pem");
pub const ROTATED_PEM: &[u8] = include_bytes!("../fixtures/signing_key_rotated.pem");

pub const PRIMARY_MODULUS: &str = "nSrvva83PycoPsafW13bFVVAyTziXh_ohZGYWJxhFyjzWCvFKEzrSXHTHyCHtVxUhcXgS5248gQ3egi8nRAD94gPl3DBgwacCf4v-eiLRMqeGmuh6n8-mt1b74bxdLkpHPbhiTc9zH4KhtdAawoUbqccp035GEqOSATWTfHMZLNfw3iazKZ1b_eYybKatWR8Wa9lm3Qg6rWwGh-67ygFh5GY1h7ABuRf6i2T8Y7NLiMoH8EDhoLL8kjWWZTkvDxeEYLy9eYcivoKnLNMUlfrHdvN-GYtH3sN0T2Yh7f8xiAU3Lfe-XQ_ct3JRjnTJmpydM3y9T0iI7g4hsmTRjKcFQ";
pub const ROTATED_MODULUS: &str = "owVp0lwBfLKW1Qn983tIwiIxFwobiImZhDHdDvDYmKCCi5iMNA6e2YyQQ_o3_tfSA0c1OOIMdW5xUzoy0jskMV_sUYyD3P0CciyG8lv5ghM-1WTACxPQ-T2swe5J3wn4slXZfLtcLV1L4z1-8sjiZeOZtTgObMCydgrfIi4I5W3UQSojOscGXEttqacHuzsmsPmJ1vMk83sGEf-Tl9OzX3Af94klOoWio2vaovRSo4wl1TgoJXyugubm84nOW1pRy0_46zDfQ-7av3-7d1g_347AZ8cc4vFIOtMCA7fJFpCQQU8ToyGad7VwuWXHQdBlfP74N9DksdaKVWl-ja9SFQ";

pub const ISSUER: &str = "http://keycloak.localhost/realms/dev";
pub const AUDIENCE: &str = "portal";
pub const JWKS_PATH: &str = "/realms/dev/protocol/openid-connect/certs";

pub fn jwk(kid: Option<&str>, modulus: &str) -> Value {
    let mut jwk = json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "n": modulus,
        "e": "AQAB"
    });
    if let Some(kid) = kid {
        jwk["kid"] = json!(kid);
    }
    jwk
}

pub fn primary_jwk() -> Value {
    jwk(Some(PRIMARY_KID), PRIMARY_MODULUS)
}

pub fn rotated_jwk() -> Value {
    jwk(Some(ROTATED_KID), ROTATED_MODULUS)
}

pub fn jwks(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims Keycloak would put in an access token for `alice`
pub fn claims() -> Value {
    let now = now();
    json!({
        "sub": "user-123",
        "preferred_username": "alice",
        "email": "alice@example.com",
        "given_name": "Alice",
        "family_name": "Liddell",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 300,
        "realm_access": { "roles": ["dev"] }
    })
}

/// `claims()` with some fields replaced (a `null` removes the claim)
pub fn claims_with(overrides: Value) -> Value {
    let mut claims = claims();
    if let (Some(base), Value::Object(overrides)) = (claims.as_object_mut(), overrides) {
        for (key, value) in overrides {
            if value.is_null() {
                base.remove(&key);
            } else {
                base.insert(key, value);
            }
        }
    }
    claims
}

pub fn sign_rs256(kid: Option<&str>, pem: &[u8], claims: &Value) -> String {
    sign_rsa(Algorithm::RS256, kid, pem, claims)
}

/// Sign with any RSA-family algorithm (RS*/PS*)
pub fn sign_rsa(alg: Algorithm, kid: Option<&str>, pem: &[u8], claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem).expect("fixture key is valid PEM");
    encode(&header, claims, &key).expect("signing succeeds")
}

pub fn primary_token(claims: &Value) -> String {
    sign_rs256(Some(PRIMARY_KID), PRIMARY_PEM, claims)
}

pub async fn mount_jwks(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// Config pointing JWKS and weather at the mock server
pub fn test_config(server: &MockServer, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("KEYCLOAK_CERT_URL".into(), jwks_url(server));
    vars.insert("KEYCLOAK_ISSUER".into(), ISSUER.into());
    vars.insert("KEYCLOAK_AUDIENCE".into(), AUDIENCE.into());
    vars.insert("WEATHER_API_URL".into(), server.uri());
    vars.insert("JWKS_MIN_REFRESH_INTERVAL_SECS".into(), "0".into());
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config is valid")
}

pub fn build_app(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_config(config).expect("state builds"));
    let app = web::create_router(state.clone(), state.jwt_validator.clone());
    (app, state)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
