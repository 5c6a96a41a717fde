//! Catalog repository: categories and products.
//!
//! Listing queries only return available products; detail lookups by slug
//! return unavailable products too so old links keep working.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use voentorg_core::{CategoryId, Price, ProductId, ProductImageId, Slug, stock_from_db};

use super::RepositoryError;
use crate::models::catalog::{
    Category, NewProductImage, Page, Product, ProductImage, ProductQuery, escape_like,
    main_image_position,
};

const PRODUCT_COLUMNS: &str = r"
    p.id, p.name, p.slug, p.description, p.short_description, p.price, p.stock,
    p.category_id, c.name AS category_name, p.is_available, p.created_at,
    (
        SELECT pi.url FROM storefront.product_image pi
        WHERE pi.product_id = p.id
        ORDER BY pi.is_main DESC, pi.display_order, pi.id
        LIMIT 1
    ) AS main_image
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    short_description: String,
    price: Price,
    stock: i32,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    is_available: bool,
    created_at: DateTime<Utc>,
    main_image: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            short_description: r.short_description,
            price: r.price,
            stock: stock_from_db(r.stock),
            category_id: r.category_id,
            category_name: r.category_name,
            is_available: r.is_available,
            main_image: r.main_image,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: ProductImageId,
    url: String,
    alt_text: String,
    is_main: bool,
    display_order: i32,
}

impl From<ImageRow> for ProductImage {
    fn from(r: ImageRow) -> Self {
        Self {
            id: r.id,
            url: r.url,
            alt_text: r.alt_text,
            is_main: r.is_main,
            display_order: u32::try_from(r.display_order).unwrap_or(0),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    parent_id: Option<CategoryId>,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            parent_id: r.parent_id,
            description: r.description,
            full_path: String::new(),
        }
    }
}

/// Catalog entry written by the seeding command.
#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub short_description: String,
    pub price: Price,
    pub stock: u32,
    pub category_id: Option<CategoryId>,
    pub is_available: bool,
}

/// Repository for catalog reads and seeding writes.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List available products matching `query`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, RepositoryError> {
        let (category_id, category_slug) = query.category_filter();
        let pattern = query.search_term().map(|q| format!("%{}%", escape_like(q)));

        let filters = r"
            p.is_available
            AND ($1::INTEGER IS NULL OR p.category_id = $1)
            AND ($2::TEXT IS NULL OR c.slug = $2)
            AND ($3::TEXT IS NULL OR p.name ILIKE $3)
        ";

        let total: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*)
            FROM storefront.product p
            LEFT JOIN storefront.category c ON c.id = p.category_id
            WHERE {filters}
            "
        ))
        .bind(category_id)
        .bind(category_slug)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product p
            LEFT JOIN storefront.category c ON c.id = p.category_id
            WHERE {filters}
            ORDER BY
                CASE WHEN $4::TEXT = 'price_asc' THEN p.price END ASC,
                CASE WHEN $4::TEXT = 'price_desc' THEN p.price END DESC,
                p.created_at DESC,
                p.id DESC
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(category_id)
        .bind(category_slug)
        .bind(pattern.as_deref())
        .bind(query.sort.code())
        .bind(i64::from(query.per_page()))
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Product::from).collect(),
            query.page(),
            query.per_page(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// Newest available products, for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product p
            LEFT JOIN storefront.category c ON c.id = p.category_id
            WHERE p.is_available
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1
            "
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by slug, available or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product p
            LEFT JOIN storefront.category c ON c.id = p.category_id
            WHERE p.slug = $1
            "
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get a product by ID, available or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        product_by_id(&mut conn, id).await
    }

    /// Get several products at once, ordered by ID. Missing IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product p
            LEFT JOIN storefront.category c ON c.id = p.category_id
            WHERE p.id = ANY($1)
            ORDER BY p.id
            "
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Pick a free product slug for `name`.
    ///
    /// Returns the plain slug when it is free or already belongs to a
    /// product of the same name; otherwise the first free `-1`, `-2`, …
    /// suffix.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `name` has no slug characters.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve_product_slug(&self, name: &str) -> Result<Slug, RepositoryError> {
        let base = Slug::from_name(name)
            .map_err(|e| RepositoryError::Conflict(format!("cannot derive slug from {name:?}: {e}")))?;

        let mut candidate = base.clone();
        let mut suffix = 0;
        loop {
            let owner: Option<String> =
                sqlx::query_scalar("SELECT name FROM storefront.product WHERE slug = $1")
                    .bind(candidate.as_str())
                    .fetch_optional(self.pool)
                    .await?;

            match owner {
                None => return Ok(candidate),
                Some(existing) if existing == name => return Ok(candidate),
                Some(_) => {
                    suffix += 1;
                    candidate = base.with_suffix(suffix);
                }
            }
        }
    }

    /// Insert or update a product keyed by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(&self, product: &ProductUpsert) -> Result<ProductId, RepositoryError> {
        let stock = super::quantity_to_db(product.stock)?;

        let id = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product
                (name, slug, description, short_description, price, stock, category_id, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                short_description = EXCLUDED.short_description,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                category_id = EXCLUDED.category_id,
                is_available = EXCLUDED.is_available
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(product.slug.as_str())
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.price)
        .bind(stock)
        .bind(product.category_id)
        .bind(product.is_available)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// A product's gallery in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows: Vec<ImageRow> = sqlx::query_as(
            r"
            SELECT id, url, alt_text, is_main, display_order
            FROM storefront.product_image
            WHERE product_id = $1
            ORDER BY display_order, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    /// Replace a product's gallery.
    ///
    /// Images are stored in list order and exactly one of them, picked by
    /// [`main_image_position`], is marked main.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails; the old gallery
    /// is kept in that case.
    pub async fn replace_images(
        &self,
        product_id: ProductId,
        images: &[NewProductImage],
    ) -> Result<usize, RepositoryError> {
        let main = main_image_position(images);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.product_image WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for (position, image) in images.iter().enumerate() {
            let display_order = i32::try_from(position)
                .map_err(|_| RepositoryError::DataCorruption(format!("gallery too long: {position}")))?;
            sqlx::query(
                r"
                INSERT INTO storefront.product_image
                    (product_id, url, alt_text, is_main, display_order)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(product_id)
            .bind(&image.url)
            .bind(&image.alt_text)
            .bind(main == Some(position))
            .bind(display_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(images.len())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories ordered by name, with full paths resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT id, name, slug, parent_id, description
            FROM storefront.category
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut categories: Vec<Category> = rows.into_iter().map(Category::from).collect();
        Category::resolve_paths(&mut categories);
        Ok(categories)
    }

    /// Get a category by slug, with its full path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.slug == slug))
    }

    /// Insert or update a category keyed by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another category already uses the name.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert_category(
        &self,
        name: &str,
        slug: &Slug,
        parent_id: Option<CategoryId>,
        description: &str,
    ) -> Result<CategoryId, RepositoryError> {
        sqlx::query_scalar(
            r"
            INSERT INTO storefront.category (name, slug, parent_id, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                parent_id = EXCLUDED.parent_id,
                description = EXCLUDED.description
            RETURNING id
            ",
        )
        .bind(name)
        .bind(slug.as_str())
        .bind(parent_id)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match super::unique_violation(&e) {
            Some(constraint) => RepositoryError::Conflict(constraint),
            None => RepositoryError::Database(e),
        })
    }

    /// Delete every product and category.
    ///
    /// Products referenced by orders cannot be deleted; they are marked
    /// unavailable instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self) -> Result<(u64, u64), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let products = sqlx::query(
            r"
            DELETE FROM storefront.product p
            WHERE NOT EXISTS (SELECT 1 FROM storefront.order_item oi WHERE oi.product_id = p.id)
            ",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("UPDATE storefront.product SET is_available = FALSE, category_id = NULL")
            .execute(&mut *tx)
            .await?;

        let categories = sqlx::query("DELETE FROM storefront.category")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok((products, categories))
    }
}

/// Fetch one product on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn product_by_id(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM storefront.product p
        LEFT JOIN storefront.category c ON c.id = p.category_id
        WHERE p.id = $1
        "
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Product::from))
}
