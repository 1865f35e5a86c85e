//! Integration tests for the authenticated HTTP pipeline
//!
//! These tests run the reqwest transport against a wiremock server to check
//! the wire contract: headers, refresh call shape and replay behaviour.

use serde_json::json;
use shop_client::models::{ProductQuery, ProductSort};
use shop_client::{ApiClient, ApiClientConfig, ApiError, ApiRequest, ShopApi, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_for(server: &MockServer) -> ApiClientConfig {
    ApiClientConfig::new(format!("{}/api", server.uri())).with_timeout(Duration::from_secs(5))
}

fn signed_in_client(server: &MockServer, access: &str, refresh: &str) -> ApiClient {
    init_tracing();
    let store = Arc::new(TokenStore::new());
    store.set_tokens(access, refresh);
    ApiClient::with_store(config_for(server), store).unwrap()
}

async fn mount_expired(server: &MockServer, route: &str, stale: &str) {
    Mock::given(path(route))
        .and(header("authorization", format!("Bearer {}", stale).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;

    mount_expired(&server, "/api/cart", "A1").await;

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .and(header("authorization", "Bearer A2"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "pricing": {"currency": "LKR", "items": [], "subtotal": 0, "tax_total": 0, "shipping_total": 0, "total": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("authorization", "Bearer R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "A1", "R1");
    let shop = ShopApi::new(client.clone());

    let cart = shop.cart().await.unwrap();

    assert!(cart.items.is_empty());
    assert_eq!(cart.pricing.currency, "LKR");
    assert_eq!(client.store().access_token().await.as_deref(), Some("A2"));
    assert_eq!(client.store().refresh_token().await.as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(path_regex(r"^/api/orders/\d+$"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
        .mount(&server)
        .await;

    Mock::given(path_regex(r"^/api/orders/\d+$"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "o1", "total": 4200})))
        .expect(5)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "A1", "R1");

    let results = futures::future::join_all(
        (0..5).map(|i| client.send(ApiRequest::get(format!("/orders/{}", i)))),
    )
    .await;

    for result in results {
        assert_eq!(result.unwrap().status, 200);
    }
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;

    mount_expired(&server, "/api/wishlist", "A1").await;

    Mock::given(path("/api/wishlist"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"})),
        )
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "A1", "R1");
    ShopApi::new(client.clone()).wishlist().await.unwrap();

    assert_eq!(client.store().refresh_token().await.as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_rejected_refresh_clears_session() {
    let server = MockServer::start().await;

    mount_expired(&server, "/api/orders", "A1").await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has been revoked"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "A1", "R1");

    let err = ShopApi::new(client.clone()).orders().await.unwrap_err();

    assert_eq!(
        err,
        ApiError::RefreshExhausted { message: "Request failed with status 401".to_string() }
    );
    assert!(err.is_auth_failure());
    assert!(!client.store().is_authenticated());
}

#[tokio::test]
async fn test_server_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Product not found."})))
        .mount(&server)
        .await;

    init_tracing();
    let shop = ShopApi::new(ApiClient::new(config_for(&server)).unwrap());

    let err = shop.product("missing").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Product not found.");
}

#[tokio::test]
async fn test_product_filters_are_sent_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("q", "niacinamide"))
        .and(query_param("skin_type", "oily_skin"))
        .and(query_param("sort", "price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "p1", "name": "Niacinamide 10%", "price": 3100, "currency": "LKR"}],
            "page": 1,
            "per_page": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    init_tracing();
    let shop = ShopApi::new(ApiClient::new(config_for(&server)).unwrap());

    let query = ProductQuery::new()
        .search("niacinamide")
        .skin_type("oily_skin")
        .sort(ProductSort::PriceAscending);
    let page = shop.products(&query).await.unwrap();

    assert_eq!(page.items[0].name.as_deref(), Some("Niacinamide 10%"));
    assert_eq!(page.per_page, 20);
}

#[tokio::test]
async fn test_login_posts_credentials_and_stores_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "nadia@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "user": {"id": "u1", "name": "Nadia", "email": "nadia@example.com", "role": "user", "is_active": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    init_tracing();
    let shop = ShopApi::new(ApiClient::new(config_for(&server)).unwrap());

    let auth = shop.login("nadia@example.com", "hunter22").await.unwrap();

    assert_eq!(auth.user.id, "u1");
    assert!(shop.is_authenticated());
}

#[tokio::test]
async fn test_default_headers_and_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/home"))
        .and(header("user-agent", "GlowcartTest/1.0"))
        .and(header("x-app-platform", "android"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    init_tracing();
    let config = config_for(&server)
        .with_user_agent("GlowcartTest/1.0")
        .with_header("X-App-Platform", "android");
    let shop = ShopApi::new(ApiClient::new(config).unwrap());

    let home = shop.home().await.unwrap();
    assert!(home.new_arrivals.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_network_failure() {
    init_tracing();
    let config = ApiClientConfig::new("http://127.0.0.1:1/api")
        .with_connect_timeout(Duration::from_secs(1));
    let client = ApiClient::new(config).unwrap();

    let err = client.send(ApiRequest::get("/home")).await.unwrap_err();

    assert!(matches!(err, ApiError::NetworkFailure(_)));
    assert_eq!(err.user_message(), shop_client::NETWORK_FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_redirects_follow_by_default_and_can_be_disabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/o1/receipt"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/api/receipts/o1", server.uri()).as_str()),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/receipts/o1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("receipt"))
        .expect(1)
        .mount(&server)
        .await;

    init_tracing();
    let client = ApiClient::new(config_for(&server)).unwrap();

    let followed = client.send(ApiRequest::get("/orders/o1/receipt")).await.unwrap();
    assert_eq!(followed.status, 200);
    assert_eq!(followed.text(), "receipt");

    let direct = client
        .send(ApiRequest::get("/orders/o1/receipt").without_redirects())
        .await
        .unwrap();
    assert_eq!(direct.status, 302);
    assert_eq!(
        direct.header("location").map(String::as_str),
        Some(format!("{}/api/receipts/o1", server.uri()).as_str())
    );
}
