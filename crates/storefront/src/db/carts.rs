//! Persisted carts of logged-in customers.
//!
//! Every function takes a connection so the cart service can run a whole
//! mutation (read stock, read line, write line) inside one transaction that
//! holds the cart row lock.

use sqlx::PgConnection;

use voentorg_core::{CartId, Price, ProductId, UserId, stock_from_db};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::cart::CartLine;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    name: String,
    slug: String,
    price: Price,
    quantity: i32,
    stock: i32,
    is_available: bool,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(r: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self::new(
            r.product_id,
            r.name,
            r.slug,
            r.price,
            quantity_from_db(r.quantity)?,
            stock_from_db(r.stock),
            r.is_available,
        ))
    }
}

/// Get the user's cart, creating it if needed, and lock its row until the
/// surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_or_create(conn: &mut PgConnection, user_id: UserId) -> Result<CartId, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.cart (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        ",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    let id = sqlx::query_scalar("SELECT id FROM storefront.cart WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}

/// Find the user's cart without creating one.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find(conn: &mut PgConnection, user_id: UserId) -> Result<Option<CartId>, RepositoryError> {
    Ok(
        sqlx::query_scalar("SELECT id FROM storefront.cart WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?,
    )
}

/// Priced lines of a cart in the order they were added.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines(conn: &mut PgConnection, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
        r"
        SELECT ci.product_id, p.name, p.slug, p.price, ci.quantity, p.stock, p.is_available
        FROM storefront.cart_item ci
        JOIN storefront.product p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.added_at, ci.id
        ",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// Quantity held for a product (0 if there is no line).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn quantity_of(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
) -> Result<u32, RepositoryError> {
    let quantity: Option<i32> = sqlx::query_scalar(
        "SELECT quantity FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2",
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    quantity.map_or(Ok(0), quantity_from_db)
}

/// Set a line to `quantity` (≥ 1), inserting it if absent.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_quantity(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
        ",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity_to_db(quantity)?)
    .execute(&mut *conn)
    .await?;

    touch(conn, cart_id).await
}

/// Delete a line. Returns whether it existed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn remove_line(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let removed = sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if removed > 0 {
        touch(conn, cart_id).await?;
    }
    Ok(removed > 0)
}

/// Delete every line. Returns how many were removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear(conn: &mut PgConnection, cart_id: CartId) -> Result<u64, RepositoryError> {
    let removed = sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    touch(conn, cart_id).await?;
    Ok(removed)
}

async fn touch(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.cart SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}
