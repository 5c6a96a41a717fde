//! Order handling for shop staff.

use voentorg_core::{OrderId, OrderStatus};
use voentorg_storefront::models::OrderDetail;
use voentorg_storefront::services::{Actor, OrderService};

use super::{CliError, connect};

/// Move an order to a new status. Cancelling returns its items to stock.
///
/// # Errors
///
/// Returns an error if the status code is unknown, the order doesn't exist
/// or the lifecycle forbids the transition.
pub async fn set_status(id: i32, status: &str) -> Result<(), CliError> {
    let next: OrderStatus = status
        .parse()
        .map_err(|_| CliError::InvalidStatus(status.to_owned()))?;

    let pool = connect().await?;
    let detail = OrderService::new(&pool)
        .change_status(Actor::Operator, OrderId::new(id), next)
        .await?;

    tracing::info!(
        order_id = %detail.order.id,
        status = %detail.order.status,
        "Order updated"
    );
    Ok(())
}

/// Print an order with its items to the log.
///
/// # Errors
///
/// Returns an error if the order doesn't exist.
pub async fn show(id: i32) -> Result<(), CliError> {
    let pool = connect().await?;
    let detail = OrderService::new(&pool).get(OrderId::new(id)).await?;
    log_order(&detail);
    Ok(())
}

fn log_order(detail: &OrderDetail) {
    let order = &detail.order;
    tracing::info!("Order #{} ({})", order.id, order.status_name);
    tracing::info!("  Placed:   {}", order.created_at);
    let customer = order
        .user_id
        .map_or_else(|| "guest".to_owned(), |id| id.to_string());
    tracing::info!("  Customer: {customer}");
    tracing::info!("  Email:    {}", order.contact_email);
    if let Some(phone) = &order.contact_phone {
        tracing::info!("  Phone:    {phone}");
    }
    if !order.shipping_address.is_empty() {
        tracing::info!("  Ship to:  {}", order.shipping_address);
    }
    for item in &detail.items {
        tracing::info!(
            "  {} x {} @ {} = {}",
            item.quantity,
            item.product_name,
            item.price,
            item.subtotal
        );
    }
    tracing::info!("  Items: {}, total: {}", detail.total_items(), order.total_amount);
}
