//! Catalog reads and product galleries against a real database.
//!
//! These tests require:
//! - A scratch `PostgreSQL` database in `TEST_DATABASE_URL`
//!
//! Run with: cargo test -p voentorg-integration-tests --test catalog -- --ignored

#![allow(clippy::indexing_slicing)]

use voentorg_integration_tests::{create_product, test_pool};
use voentorg_storefront::db::catalog::CatalogRepository;
use voentorg_storefront::models::{NewProductImage, ProductQuery};

fn image(url: &str, is_main: bool) -> NewProductImage {
    NewProductImage {
        url: url.to_string(),
        alt_text: String::new(),
        is_main,
    }
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_blank_search_lists_available_products() {
    let pool = test_pool().await.expect("test database");
    let listed = create_product(&pool, 50_000, 2).await.expect("product");
    let hidden = create_product(&pool, 50_000, 2).await.expect("product");
    sqlx::query("UPDATE storefront.product SET is_available = FALSE WHERE id = $1")
        .bind(hidden)
        .execute(&pool)
        .await
        .expect("hide product");

    let query = ProductQuery {
        q: Some("   ".to_string()),
        per_page: Some(100),
        ..ProductQuery::default()
    };
    let page = CatalogRepository::new(&pool)
        .list_products(&query)
        .await
        .expect("search");

    assert!(page.total >= 1);
    assert!(page.items.iter().any(|p| p.id == listed));
    assert!(page.items.iter().all(|p| p.id != hidden && p.is_available));
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_gallery_keeps_a_single_main_image() {
    let pool = test_pool().await.expect("test database");
    let product = create_product(&pool, 75_000, 5).await.expect("product");
    let catalog = CatalogRepository::new(&pool);

    let stored = catalog
        .replace_images(
            product,
            &[
                image("/media/front.jpg", true),
                image("/media/side.jpg", false),
                image("/media/back.jpg", true),
            ],
        )
        .await
        .expect("store gallery");
    assert_eq!(stored, 3);

    let images = catalog.product_images(product).await.expect("gallery");
    let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, ["/media/front.jpg", "/media/side.jpg", "/media/back.jpg"]);
    assert_eq!(images.iter().filter(|i| i.is_main).count(), 1);
    assert!(images[2].is_main);
    assert_eq!(images[1].display_order, 1);

    let listed = catalog
        .get_product(product)
        .await
        .expect("product")
        .expect("exists");
    assert_eq!(listed.main_image.as_deref(), Some("/media/back.jpg"));

    let err = sqlx::query(
        "INSERT INTO storefront.product_image (product_id, url, is_main) VALUES ($1, $2, TRUE)",
    )
    .bind(product)
    .bind("/media/extra.jpg")
    .execute(&pool)
    .await
    .expect_err("second main image");
    assert!(err.as_database_error().is_some_and(|e| e.is_unique_violation()));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_replacing_gallery_defaults_main_to_first() {
    let pool = test_pool().await.expect("test database");
    let product = create_product(&pool, 30_000, 1).await.expect("product");
    let catalog = CatalogRepository::new(&pool);

    assert_eq!(
        catalog
            .get_product(product)
            .await
            .expect("product")
            .expect("exists")
            .main_image,
        None
    );

    catalog
        .replace_images(product, &[image("/media/old.jpg", true)])
        .await
        .expect("first gallery");
    catalog
        .replace_images(
            product,
            &[image("/media/new-1.jpg", false), image("/media/new-2.jpg", false)],
        )
        .await
        .expect("second gallery");

    let images = catalog.product_images(product).await.expect("gallery");
    assert_eq!(images.len(), 2);
    assert!(images[0].is_main);
    assert!(!images[1].is_main);
    assert!(images.iter().all(|i| i.url != "/media/old.jpg"));
}
