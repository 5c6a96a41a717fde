//! Order repository.
//!
//! Reads go through [`OrderRepository`]. Writes happen inside the checkout and
//! status-change transactions and therefore take a connection.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use voentorg_core::{
    OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId, stock_from_db,
};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::order::{Order, OrderDetail, OrderItem};
use crate::services::checkout::{PlannedItem, ProductSnapshot, ResolvedContact};

const ORDER_COLUMNS: &str = r"
    id, user_id, status::TEXT AS status, total_amount, contact_email, contact_phone,
    shipping_address, notes, created_at, updated_at
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    status: String,
    total_amount: Price,
    contact_email: String,
    contact_phone: Option<String>,
    shipping_address: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let status = parse_status(&r.status)?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            status,
            status_name: status.name(),
            total_amount: r.total_amount,
            contact_email: r.contact_email,
            contact_phone: r.contact_phone,
            shipping_address: r.shipping_address,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn parse_status(code: &str) -> Result<OrderStatus, RepositoryError> {
    code.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid order status in database: {e}")))
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Price,
    subtotal: Price,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            quantity: quantity_from_db(r.quantity)?,
            price: r.price,
            subtotal: r.subtotal,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: ProductId,
    name: String,
    price: Price,
    stock: i32,
    is_available: bool,
}

/// Repository for reading orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's orders, newest first. `limit` of `None` returns all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM storefront."order"
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit.map(i64::from))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        detail(&mut conn, id).await
    }
}

/// An order with its items, on an existing connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn detail(conn: &mut PgConnection, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        r#"SELECT {ORDER_COLUMNS} FROM storefront."order" WHERE id = $1"#
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = items(conn, id).await?;
    Ok(Some(OrderDetail {
        order: Order::try_from(row)?,
        items,
    }))
}

async fn items(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        r"
        SELECT id, order_id, product_id, product_name, quantity, price, subtotal
        FROM storefront.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OrderItem::try_from).collect()
}

// =============================================================================
// Checkout transaction
// =============================================================================

/// Lock product rows in ID order and return their current state.
///
/// Locking in a fixed order keeps two concurrent checkouts from deadlocking.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<ProductSnapshot>, RepositoryError> {
    let mut ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    ids.sort_unstable();
    ids.dedup();

    let rows: Vec<SnapshotRow> = sqlx::query_as(
        r"
        SELECT id, name, price, stock, is_available
        FROM storefront.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ProductSnapshot {
            id: r.id,
            name: r.name,
            price: r.price,
            stock: stock_from_db(r.stock),
            is_available: r.is_available,
        })
        .collect())
}

/// Insert the order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: Option<UserId>,
    total: Price,
    contact: &ResolvedContact,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO storefront."order"
            (user_id, status, total_amount, contact_email, contact_phone, shipping_address, notes)
        VALUES ($1, $2::TEXT::storefront.order_status, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(OrderStatus::New.code())
    .bind(total)
    .bind(contact.email.as_str())
    .bind(contact.phone.as_ref().map(voentorg_core::Phone::as_str))
    .bind(&contact.shipping_address)
    .bind(&contact.notes)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Insert one order item.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &PlannedItem,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.order_item
            (order_id, product_id, product_name, quantity, price, subtotal)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(quantity_to_db(item.quantity)?)
    .bind(item.price)
    .bind(item.subtotal)
    .execute(conn)
    .await?;

    Ok(())
}

/// Take `quantity` units out of stock.
///
/// Returns `false` without changing anything if fewer units are left.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<bool, RepositoryError> {
    let affected = sqlx::query(
        r"
        UPDATE storefront.product
        SET stock = stock - $2
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(product_id)
    .bind(quantity_to_db(quantity)?)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(affected == 1)
}

// =============================================================================
// Status transaction
// =============================================================================

/// Current status of an order, locking its row. `None` if it doesn't exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_status(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<(OrderStatus, Option<UserId>)>, RepositoryError> {
    let row: Option<(String, Option<UserId>)> = sqlx::query_as(
        r#"SELECT status::TEXT, user_id FROM storefront."order" WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(|(status, user_id)| Ok((parse_status(&status)?, user_id)))
        .transpose()
}

/// Write a new status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE storefront."order"
        SET status = $2::TEXT::storefront.order_status, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.code())
    .execute(conn)
    .await?;
    Ok(())
}

/// Return every item's quantity of an order to stock.
///
/// Product rows are locked in ID order first, matching [`lock_products`].
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restock(conn: &mut PgConnection, id: OrderId) -> Result<u64, RepositoryError> {
    sqlx::query(
        r"
        SELECT p.id
        FROM storefront.product p
        WHERE p.id IN (SELECT product_id FROM storefront.order_item WHERE order_id = $1)
        ORDER BY p.id
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let affected = sqlx::query(
        r"
        UPDATE storefront.product p
        SET stock = p.stock + totals.quantity
        FROM (
            SELECT product_id, SUM(quantity)::INTEGER AS quantity
            FROM storefront.order_item
            WHERE order_id = $1
            GROUP BY product_id
        ) AS totals
        WHERE p.id = totals.product_id
        ",
    )
    .bind(id)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(affected)
}
