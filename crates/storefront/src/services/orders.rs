//! Order history and status changes.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use voentorg_core::{OrderId, OrderStatus, StatusTransitionError, UserId};

use crate::db::RepositoryError;
use crate::db::orders::{self, OrderRepository};
use crate::models::order::{Order, OrderDetail};

/// Number of orders shown on the account page.
pub const RECENT_ORDERS: u32 = 10;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No such order, or it belongs to someone else.
    #[error("order not found")]
    NotFound,

    /// Customers can only cancel orders that are still new.
    #[error("order can no longer be cancelled (status: {0})")]
    NotCancellable(OrderStatus),

    /// The lifecycle forbids this change.
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The customer who placed the order.
    Customer(UserId),
    /// Shop staff via the CLI.
    Operator,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// The customer's most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn recent_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .list_for_user(user_id, Some(RECENT_ORDERS))
            .await?)
    }

    /// Every order of the customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn all_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user_id, None).await?)
    }

    /// An order of this customer with its items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist or belongs to
    /// another customer.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, OrderError> {
        self.orders
            .get_detail(order_id)
            .await?
            .filter(|detail| detail.order.user_id == Some(user_id))
            .ok_or(OrderError::NotFound)
    }

    /// Any order with its items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn get(&self, order_id: OrderId) -> Result<OrderDetail, OrderError> {
        self.orders
            .get_detail(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Move an order to `next`.
    ///
    /// Customers may only cancel their own `new` orders. Cancelling returns
    /// the ordered quantities to stock in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::NotCancellable` or
    /// `OrderError::Transition` when the change is refused.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        actor: Actor,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;

        let (current, owner) = orders::lock_status(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if let Actor::Customer(user_id) = actor {
            if owner != Some(user_id) {
                return Err(OrderError::NotFound);
            }
            if next != OrderStatus::Cancelled || !current.is_cancellable_by_customer() {
                return Err(OrderError::NotCancellable(current));
            }
        }

        let next = current.transition_to(next)?;
        orders::update_status(&mut tx, order_id, next).await?;

        if next == OrderStatus::Cancelled {
            let restocked = orders::restock(&mut tx, order_id).await?;
            tracing::info!(%order_id, restocked, "order cancelled, stock returned");
        }

        let detail = orders::detail(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        tx.commit().await?;

        tracing::info!(%order_id, from = %current, to = %next, ?actor, "order status changed");
        Ok(detail)
    }
}
