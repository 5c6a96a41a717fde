//! Catalog route handlers: home, products, categories, search.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use voentorg_core::{CurrencyCode, OrderStatus};

use crate::db::catalog::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::{Category, CategoryDetail, Page, Product, ProductDetail, ProductQuery};
use crate::state::AppState;

/// Products shown on the home page.
const FEATURED_PRODUCTS: u32 = 12;

/// Home page data.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub featured: Vec<Product>,
    pub categories: Vec<Category>,
    pub currency: CurrencyCode,
}

/// Product listing with the currency prices are shown in.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub currency: CurrencyCode,
}

/// Search query string.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Search results.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(flatten)]
    pub page: Page<Product>,
}

/// One entry of the order status registry.
#[derive(Debug, Serialize)]
pub struct StatusEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub is_terminal: bool,
}

/// Home page: newest available products and all categories.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>> {
    let catalog = CatalogRepository::new(state.pool());
    let featured = catalog.featured_products(FEATURED_PRODUCTS).await?;
    let categories = catalog.list_categories().await?;

    Ok(Json(HomeResponse {
        featured,
        categories,
        currency: state.currency(),
    }))
}

/// Product listing with category, search and sort filters.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let page = CatalogRepository::new(state.pool())
        .list_products(&query)
        .await?;

    Ok(Json(ProductListResponse {
        page,
        currency: state.currency(),
    }))
}

/// Product detail by slug, with its image gallery.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let catalog = CatalogRepository::new(state.pool());
    let product = catalog
        .get_product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    let images = catalog.product_images(product.id).await?;

    Ok(Json(ProductDetail { product, images }))
}

/// All categories with their full paths.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CatalogRepository::new(state.pool())
        .list_categories()
        .await?;
    Ok(Json(categories))
}

/// A category and one page of its products.
#[instrument(skip(state))]
pub async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(mut query): Query<ProductQuery>,
) -> Result<Json<CategoryDetail>> {
    let catalog = CatalogRepository::new(state.pool());
    let category = catalog
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

    query.category = Some(category.slug.clone());
    let products = catalog.list_products(&query).await?;

    Ok(Json(CategoryDetail { category, products }))
}

/// Case-insensitive product name search. A blank query lists every available
/// product.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let query = ProductQuery {
        q: search.q,
        page: search.page,
        per_page: search.per_page,
        ..ProductQuery::default()
    };

    let page = CatalogRepository::new(state.pool())
        .list_products(&query)
        .await?;

    Ok(Json(SearchResponse {
        query: query.search_term().unwrap_or_default().to_owned(),
        page,
    }))
}

/// The order status registry, in lifecycle order.
pub async fn order_statuses() -> Json<Vec<StatusEntry>> {
    Json(status_registry())
}

fn status_registry() -> Vec<StatusEntry> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusEntry {
            code: status.code(),
            name: status.name(),
            description: status.description(),
            is_terminal: status.is_terminal(),
        })
        .collect()
}
