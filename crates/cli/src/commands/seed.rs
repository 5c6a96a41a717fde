//! Seed the catalog from a YAML file.
//!
//! The file lists categories, products and optional test users. Seeding is
//! idempotent: categories and products are upserted by slug, a product that
//! lists images gets exactly that gallery, and users that already exist are
//! left alone.
//!
//! ```yaml
//! categories:
//!   - name: Footwear
//!     slug: footwear
//!     description: Boots and trail shoes
//! products:
//!   - name: Tactical boots
//!     category: footwear
//!     price: "3800.00"
//!     stock: 18
//!     images:
//!       - url: https://cdn.example.com/boots-front.jpg
//!         main: true
//!       - url: https://cdn.example.com/boots-side.jpg
//! users:
//!   - username: buyer
//!     email: buyer@example.com
//!     password: buyerpass123
//! ```

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};

use voentorg_core::{CategoryId, Price, Slug};
use voentorg_storefront::db::catalog::{CatalogRepository, ProductUpsert};
use voentorg_storefront::models::NewProductImage;
use voentorg_storefront::services::{AuthError, AuthService, RegisterInput};

use super::{CliError, connect};

/// Catalog file used when `--file` is not given.
pub const DEFAULT_CATALOG_FILE: &str = "crates/cli/data/catalog.yaml";

/// Top-level layout of the catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

/// A category entry.
#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
    /// Slug of a category listed earlier in the file.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A product entry.
#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    /// Category slug.
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Gallery in display order.
    #[serde(default)]
    pub images: Vec<ImageSeed>,
}

/// A product image entry.
#[derive(Debug, Deserialize)]
pub struct ImageSeed {
    /// Absolute `http(s)` URL or a path under the site root.
    pub url: String,
    #[serde(default)]
    pub alt: String,
    /// Main image; the first image is used when none is marked.
    #[serde(default)]
    pub main: bool,
}

impl From<&ImageSeed> for NewProductImage {
    fn from(seed: &ImageSeed) -> Self {
        Self {
            url: seed.url.trim().to_owned(),
            alt_text: seed.alt.clone(),
            is_main: seed.main,
        }
    }
}

fn is_image_url(url: &str) -> bool {
    let url = url.trim();
    ["https://", "http://", "/"]
        .iter()
        .any(|prefix| url.len() > prefix.len() && url.starts_with(prefix))
}

const fn default_available() -> bool {
    true
}

/// A test account entry.
#[derive(Debug, Deserialize)]
pub struct UserSeed {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// What a seeding run did.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub images: usize,
    pub users_created: usize,
    pub users_skipped: usize,
}

/// Check a catalog file before touching the database.
///
/// Returns one message per problem; an empty list means the file is usable.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut category_slugs = HashSet::new();

    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            errors.push(format!("category {:?}: name is empty", category.slug));
        }
        if let Err(e) = Slug::parse(&category.slug) {
            errors.push(format!("category {:?}: {e}", category.slug));
        }
        if let Some(parent) = &category.parent
            && !category_slugs.contains(parent.as_str())
        {
            errors.push(format!(
                "category {:?}: parent {parent:?} must be listed before it",
                category.slug
            ));
        }
        if !category_slugs.insert(category.slug.as_str()) {
            errors.push(format!("category {:?}: duplicate slug", category.slug));
        }
    }

    let mut product_slugs = HashSet::new();
    for product in &catalog.products {
        if product.name.trim().is_empty() {
            errors.push("product with an empty name".to_string());
            continue;
        }
        let slug = match &product.slug {
            Some(slug) => Slug::parse(slug),
            None => Slug::from_name(&product.name),
        };
        match slug {
            Ok(slug) => {
                if product.slug.is_some() && !product_slugs.insert(slug) {
                    errors.push(format!("product {:?}: duplicate slug", product.name));
                }
            }
            Err(e) => errors.push(format!("product {:?}: {e}", product.name)),
        }
        if Price::new(product.price).is_none() {
            errors.push(format!("product {:?}: price cannot be negative", product.name));
        }
        if let Some(category) = &product.category
            && !category_slugs.contains(category.as_str())
        {
            errors.push(format!(
                "product {:?}: unknown category {category:?}",
                product.name
            ));
        }
        for image in product.images.iter().filter(|i| !is_image_url(&i.url)) {
            errors.push(format!(
                "product {:?}: bad image url {:?}",
                product.name, image.url
            ));
        }
        if product.images.iter().filter(|i| i.main).count() > 1 {
            errors.push(format!(
                "product {:?}: more than one main image",
                product.name
            ));
        }
    }

    for user in &catalog.users {
        if user.password.chars().count() < 8 {
            errors.push(format!(
                "user {:?}: password must be at least 8 characters",
                user.username
            ));
        }
    }

    errors
}

/// Seed categories, products and users from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn catalog(path: &Path, clear: bool) -> Result<(), CliError> {
    info!(path = %path.display(), "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidCatalog(errors.len()));
    }

    let pool = connect().await?;

    if clear {
        let (products, categories) = CatalogRepository::new(&pool).clear().await?;
        info!(products, categories, "Catalog cleared");
    }

    let summary = seed(&pool, &catalog).await?;

    info!("Seeding complete!");
    info!("  Categories upserted: {}", summary.categories);
    info!("  Products upserted: {}", summary.products);
    info!("  Product images stored: {}", summary.images);
    info!("  Users created: {}", summary.users_created);
    info!("  Users skipped (already exist): {}", summary.users_skipped);

    Ok(())
}

async fn seed(pool: &sqlx::PgPool, catalog: &CatalogFile) -> Result<SeedSummary, CliError> {
    let repo = CatalogRepository::new(pool);
    let mut summary = SeedSummary::default();
    let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();

    for category in &catalog.categories {
        let slug = Slug::parse(&category.slug)?;
        let parent_id = category
            .parent
            .as_deref()
            .and_then(|parent| category_ids.get(parent).copied());

        let id = repo
            .upsert_category(&category.name, &slug, parent_id, &category.description)
            .await?;
        category_ids.insert(category.slug.as_str(), id);
        summary.categories += 1;
    }

    for product in &catalog.products {
        let slug = match &product.slug {
            Some(slug) => Slug::parse(slug)?,
            None => repo.resolve_product_slug(&product.name).await?,
        };
        let price = Price::new(product.price).ok_or(CliError::InvalidCatalog(1))?;
        let category_id = product
            .category
            .as_deref()
            .and_then(|c| category_ids.get(c).copied());

        let product_id = repo
            .upsert_product(&ProductUpsert {
                name: product.name.clone(),
                slug,
                description: product.description.clone(),
                short_description: product.short_description.clone(),
                price,
                stock: product.stock,
                category_id,
                is_available: product.available,
            })
            .await?;
        if !product.images.is_empty() {
            let images: Vec<NewProductImage> =
                product.images.iter().map(NewProductImage::from).collect();
            summary.images += repo.replace_images(product_id, &images).await?;
        }
        info!(name = %product.name, images = product.images.len(), "Product upserted");
        summary.products += 1;
    }

    let auth = AuthService::new(pool);
    for user in &catalog.users {
        let input = RegisterInput {
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            password_confirm: user.password.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
        };
        match auth.register(&input).await {
            Ok(created) => {
                info!(username = %created.username, "User created");
                summary.users_created += 1;
            }
            Err(AuthError::UsernameTaken | AuthError::EmailTaken) => {
                summary.users_skipped += 1;
            }
            Err(e) => {
                warn!(username = %user.username, error = %e, "User not created");
                return Err(e.into());
            }
        }
    }

    Ok(summary)
}
