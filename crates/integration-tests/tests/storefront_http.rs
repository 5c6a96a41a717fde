//! Smoke tests for the storefront JSON API.
//!
//! These tests require:
//! - A migrated and seeded database (`vt-cli migrate && vt-cli seed`)
//! - The storefront running at `STOREFRONT_TEST_URL` (default `http://localhost:3000`)
//!
//! Run with: cargo test -p voentorg-integration-tests --test storefront_http -- --ignored

#![allow(clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use voentorg_integration_tests::{TEST_PASSWORD, storefront_url, unique};

/// A client that keeps the session cookie between requests, like a browser.
fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

async fn get_json(client: &Client, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", storefront_url()))
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.expect("JSON body"))
}

async fn post_json(client: &Client, path: &str, body: &Value) -> (StatusCode, Value) {
    let resp = client
        .post(format!("{}{path}", storefront_url()))
        .json(body)
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.expect("JSON body"))
}

/// First product with at least `min_stock` units, as `(id, stock)`.
async fn stocked_product(client: &Client, min_stock: u64) -> (u64, u64) {
    let (status, page) = get_json(client, "/products?per_page=100").await;
    assert_eq!(status, StatusCode::OK);
    page["items"]
        .as_array()
        .expect("items")
        .iter()
        .find_map(|p| {
            let stock = p["stock"].as_u64()?;
            (stock >= min_stock).then(|| (p["id"].as_u64().unwrap_or_default(), stock))
        })
        .expect("seeded catalog has a stocked product")
}

// ============================================================================
// Health & Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = browser();
    for path in ["/health", "/health/ready"] {
        let resp = client
            .get(format!("{}{path}", storefront_url()))
            .send()
            .await
            .expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_catalog_browsing() {
    let client = browser();

    let (status, home) = get_json(&client, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(home["featured"].as_array().is_some_and(|f| f.len() <= 12));

    let (status, categories) = get_json(&client, "/categories").await;
    assert_eq!(status, StatusCode::OK);
    let slug = categories[0]["slug"].as_str().expect("category slug").to_string();

    let (status, category) = get_json(&client, &format!("/categories/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(category["category"]["slug"], slug.as_str());

    let (status, sorted) = get_json(&client, "/products?sort=price_asc&per_page=5").await;
    assert_eq!(status, StatusCode::OK);
    let prices: Vec<f64> = sorted["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|p| p["price"].as_str()?.parse().ok())
        .collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));

    let (_, listing) = get_json(&client, "/products?per_page=1").await;
    let first = &listing["items"][0];
    let slug = first["slug"].as_str().expect("product slug");
    let (status, detail) = get_json(&client, &format!("/products/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
    let images = detail["images"].as_array().expect("images");
    let mains: Vec<&Value> = images.iter().filter(|i| i["is_main"] == true).collect();
    assert_eq!(mains.len(), 1);
    assert_eq!(first["main_image"], mains[0]["url"]);

    let (status, _) = get_json(&client, "/products/no-such-product").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = get_json(&client, "/products").await;
    let (status, blank) = get_json(&client, "/search?q=%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(blank["query"], "");
    assert_eq!(blank["total"], all["total"]);
    assert!(blank["total"].as_u64().is_some_and(|t| t > 0));
}

// ============================================================================
// Cart & Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_guest_cart_clamps_and_clears() {
    let client = browser();
    let (product_id, stock) = stocked_product(&client, 1).await;

    let (status, cart) = post_json(
        &client,
        "/cart/add",
        &json!({"product_id": product_id, "quantity": stock + 5}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_items"], stock);
    assert_eq!(cart["notices"][0]["outcome"], "clamped");

    let (status, removed) =
        post_json(&client, "/cart/remove", &json!({"product_id": product_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["removed"], true);
    assert_eq!(removed["cart"]["total_items"], 0);

    let (status, body) = post_json(&client, "/checkout", &json!({"contact_email": "a@b.ru"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_merges_cart_then_checkout_and_cancel() {
    let client = browser();
    let (product_id, _) = stocked_product(&client, 2).await;

    let (status, _) = post_json(
        &client,
        "/cart/add",
        &json!({"product_id": product_id, "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json(&client, "/account").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let suffix = unique();
    let (status, registered) = post_json(
        &client,
        "/auth/register",
        &json!({
            "username": format!("smoke_{suffix}"),
            "email": format!("smoke-{suffix}@example.com"),
            "password": TEST_PASSWORD,
            "password_confirm": TEST_PASSWORD,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["cart"]["total_items"], 1);

    let (status, order) = post_json(&client, "/checkout", &json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "new");
    let order_id = order["id"].as_u64().expect("order id");

    let (_, cart) = get_json(&client, "/cart").await;
    assert_eq!(cart["total_items"], 0);

    let (status, account) = get_json(&client, "/account").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["recent_orders"][0]["id"], order_id);

    let (status, cancelled) =
        post_json(&client, &format!("/account/orders/{order_id}/cancel"), &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) =
        post_json(&client, &format!("/account/orders/{order_id}/cancel"), &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resp = client
        .post(format!("{}/auth/logout", storefront_url()))
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = get_json(&client, &format!("/account/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_with_wrong_password() {
    let client = browser();
    let (status, body) = post_json(
        &client,
        "/auth/login",
        &json!({"email": "test@voentorg.ru", "password": "not-the-password"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}
