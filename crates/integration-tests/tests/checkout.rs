//! Cart, checkout and order lifecycle against a real database.
//!
//! These tests require:
//! - A scratch `PostgreSQL` database in `TEST_DATABASE_URL`
//!
//! Run with: cargo test -p voentorg-integration-tests -- --ignored

#![allow(clippy::indexing_slicing)]

use voentorg_core::{OrderStatus, QuantityAdjustment};
use voentorg_integration_tests::{
    amount, create_product, create_user, guest_session, orders_with, set_stock, stock_of,
    test_pool,
};
use voentorg_storefront::models::ContactInput;
use voentorg_storefront::services::{
    Actor, CartOwner, CartService, CheckoutError, CheckoutService, OrderError, OrderService,
};

fn guest_contact() -> ContactInput {
    ContactInput {
        contact_email: Some("guest@example.com".to_string()),
        shipping_address: Some("Moscow, Arbat 1".to_string()),
        ..ContactInput::default()
    }
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_add_beyond_stock_is_clamped() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let product = create_product(&pool, 150_000, 4).await.expect("product");

    let cart = CartService::new(&pool)
        .add(CartOwner::User(user.id), product, 10)
        .await
        .expect("add");

    assert_eq!(cart.total_items, 4);
    assert_eq!(cart.notices.len(), 1);
    assert_eq!(
        cart.notices[0].adjustment,
        QuantityAdjustment::Clamped {
            requested: 10,
            quantity: 4
        }
    );
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 4);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_guest_cart_merges_once() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let product = create_product(&pool, 80_000, 5).await.expect("product");
    let carts = CartService::new(&pool);
    let session = guest_session();

    carts
        .add(CartOwner::User(user.id), product, 2)
        .await
        .expect("user add");
    carts
        .add(CartOwner::Guest(&session), product, 2)
        .await
        .expect("guest add");

    let merged = carts
        .merge_session_cart(&session, user.id)
        .await
        .expect("merge");
    assert_eq!(merged.total_items, 4);

    let again = carts
        .merge_session_cart(&session, user.id)
        .await
        .expect("second merge");
    assert_eq!(again.total_items, 4);

    let guest = carts.view(CartOwner::Guest(&session)).await.expect("view");
    assert!(guest.is_empty());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_merge_clamps_to_stock() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let product = create_product(&pool, 80_000, 3).await.expect("product");
    let carts = CartService::new(&pool);
    let session = guest_session();

    carts
        .add(CartOwner::User(user.id), product, 2)
        .await
        .expect("user add");
    carts
        .add(CartOwner::Guest(&session), product, 3)
        .await
        .expect("guest add");

    let merged = carts
        .merge_session_cart(&session, user.id)
        .await
        .expect("merge");
    assert_eq!(merged.total_items, 3);
    assert_eq!(merged.notices.len(), 1);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_user_checkout_decrements_stock_and_empties_cart() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let boots = create_product(&pool, 380_000, 5).await.expect("boots");
    let flask = create_product(&pool, 80_000, 10).await.expect("flask");
    let owner = CartOwner::User(user.id);

    let carts = CartService::new(&pool);
    carts.add(owner, boots, 2).await.expect("add boots");
    carts.add(owner, flask, 3).await.expect("add flask");

    let order = CheckoutService::new(&pool)
        .place_order(owner, &ContactInput::default())
        .await
        .expect("checkout");

    assert_eq!(order.order.status, OrderStatus::New);
    assert_eq!(order.order.user_id, Some(user.id));
    assert_eq!(order.order.contact_email, user.email.as_str());
    assert_eq!(order.order.total_amount.amount(), amount(2 * 380_000 + 3 * 80_000));
    let subtotals: rust_decimal::Decimal = order.items.iter().map(|i| i.subtotal.amount()).sum();
    assert_eq!(subtotals, order.order.total_amount.amount());

    assert_eq!(stock_of(&pool, boots).await.expect("stock"), 3);
    assert_eq!(stock_of(&pool, flask).await.expect("stock"), 7);
    assert!(carts.view(owner).await.expect("view").is_empty());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_guest_checkout_requires_email() {
    let pool = test_pool().await.expect("test database");
    let product = create_product(&pool, 120_000, 5).await.expect("product");
    let session = guest_session();
    let owner = CartOwner::Guest(&session);

    CartService::new(&pool)
        .add(owner, product, 1)
        .await
        .expect("add");

    let err = CheckoutService::new(&pool)
        .place_order(owner, &ContactInput::default())
        .await
        .expect_err("missing email");
    assert!(matches!(err, CheckoutError::MissingEmail));

    let order = CheckoutService::new(&pool)
        .place_order(owner, &guest_contact())
        .await
        .expect("checkout");
    assert_eq!(order.order.user_id, None);
    assert_eq!(order.order.contact_email, "guest@example.com");
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 4);

    let cart = CartService::new(&pool).view(owner).await.expect("view");
    assert!(cart.is_empty());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_checkout_refused_when_stock_ran_out() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let product = create_product(&pool, 250_000, 5).await.expect("product");
    let owner = CartOwner::User(user.id);

    CartService::new(&pool)
        .add(owner, product, 3)
        .await
        .expect("add");
    set_stock(&pool, product, 1).await.expect("sold elsewhere");

    let err = CheckoutService::new(&pool)
        .place_order(owner, &ContactInput::default())
        .await
        .expect_err("insufficient stock");
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 3,
            available: 1,
            ..
        }
    ));

    assert_eq!(stock_of(&pool, product).await.expect("stock"), 1);
    assert_eq!(orders_with(&pool, product).await.expect("orders"), 0);
    assert_eq!(CartService::new(&pool).view(owner).await.expect("view").total_items, 3);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_concurrent_checkouts_never_oversell() {
    let pool = test_pool().await.expect("test database");
    let first = create_user(&pool).await.expect("first user");
    let second = create_user(&pool).await.expect("second user");
    let product = create_product(&pool, 420_000, 5).await.expect("product");

    let carts = CartService::new(&pool);
    carts
        .add(CartOwner::User(first.id), product, 3)
        .await
        .expect("first add");
    carts
        .add(CartOwner::User(second.id), product, 3)
        .await
        .expect("second add");

    let checkout = CheckoutService::new(&pool);
    let contact = ContactInput::default();
    let (a, b) = tokio::join!(
        checkout.place_order(CartOwner::User(first.id), &contact),
        checkout.place_order(CartOwner::User(second.id), &contact),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 2);
    assert_eq!(orders_with(&pool, product).await.expect("orders"), 1);
}

// =============================================================================
// Order Lifecycle
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_cancel_restores_stock_once() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let product = create_product(&pool, 150_000, 6).await.expect("product");
    let owner = CartOwner::User(user.id);

    CartService::new(&pool)
        .add(owner, product, 4)
        .await
        .expect("add");
    let order = CheckoutService::new(&pool)
        .place_order(owner, &ContactInput::default())
        .await
        .expect("checkout");
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 2);

    let orders = OrderService::new(&pool);
    let cancelled = orders
        .change_status(Actor::Customer(user.id), order.order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 6);

    let err = orders
        .change_status(Actor::Operator, order.order.id, OrderStatus::Cancelled)
        .await
        .expect_err("already cancelled");
    assert!(matches!(err, OrderError::Transition(_)));
    assert_eq!(stock_of(&pool, product).await.expect("stock"), 6);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_cancel_and_checkout_on_shared_products_both_finish() {
    let pool = test_pool().await.expect("test database");
    let contact = ContactInput::default();

    for _ in 0..5 {
        let canceller = create_user(&pool).await.expect("canceller");
        let buyer = create_user(&pool).await.expect("buyer");
        let low = create_product(&pool, 10_000, 10).await.expect("low id");
        let high = create_product(&pool, 20_000, 10).await.expect("high id");

        // The order lines go high id first so a join-order restock would lock backwards.
        let carts = CartService::new(&pool);
        for product in [high, low] {
            carts
                .add(CartOwner::User(canceller.id), product, 2)
                .await
                .expect("canceller add");
            carts
                .add(CartOwner::User(buyer.id), product, 3)
                .await
                .expect("buyer add");
        }
        let placed = CheckoutService::new(&pool)
            .place_order(CartOwner::User(canceller.id), &contact)
            .await
            .expect("first checkout");

        let orders = OrderService::new(&pool);
        let checkout = CheckoutService::new(&pool);
        let (cancelled, bought) = tokio::join!(
            orders.change_status(
                Actor::Customer(canceller.id),
                placed.order.id,
                OrderStatus::Cancelled
            ),
            checkout.place_order(CartOwner::User(buyer.id), &contact),
        );

        cancelled.expect("cancel");
        bought.expect("second checkout");
        assert_eq!(stock_of(&pool, low).await.expect("stock"), 7);
        assert_eq!(stock_of(&pool, high).await.expect("stock"), 7);
    }
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_lifecycle_and_customer_rules() {
    let pool = test_pool().await.expect("test database");
    let user = create_user(&pool).await.expect("user");
    let stranger = create_user(&pool).await.expect("stranger");
    let product = create_product(&pool, 99_900, 3).await.expect("product");
    let owner = CartOwner::User(user.id);

    CartService::new(&pool)
        .add(owner, product, 1)
        .await
        .expect("add");
    let order = CheckoutService::new(&pool)
        .place_order(owner, &ContactInput::default())
        .await
        .expect("checkout");
    let id = order.order.id;
    let orders = OrderService::new(&pool);

    let err = orders
        .change_status(Actor::Operator, id, OrderStatus::Delivered)
        .await
        .expect_err("skipping steps");
    assert!(matches!(err, OrderError::Transition(_)));

    let err = orders
        .change_status(Actor::Customer(stranger.id), id, OrderStatus::Cancelled)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, OrderError::NotFound));
    assert!(matches!(
        orders.get_for_user(stranger.id, id).await,
        Err(OrderError::NotFound)
    ));

    for next in [OrderStatus::Processing, OrderStatus::Shipped] {
        orders
            .change_status(Actor::Operator, id, next)
            .await
            .expect("operator transition");
    }

    let err = orders
        .change_status(Actor::Customer(user.id), id, OrderStatus::Cancelled)
        .await
        .expect_err("shipped orders cannot be cancelled");
    assert!(matches!(
        err,
        OrderError::NotCancellable(OrderStatus::Shipped)
    ));

    let delivered = orders
        .change_status(Actor::Operator, id, OrderStatus::Delivered)
        .await
        .expect("deliver");
    assert!(delivered.order.status.is_terminal());

    let history = orders.all_for_user(user.id).await.expect("history");
    assert!(history.iter().any(|o| o.id == id));
}
