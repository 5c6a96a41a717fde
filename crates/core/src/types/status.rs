//! Order lifecycle statuses.
//!
//! The set is fixed: `new`, `processing`, `shipped`, `delivered`,
//! `cancelled`. It is stored as the `storefront.order_status` enum.
//!
//! ```text
//! new ──► processing ──► shipped ──► delivered
//!  │          │
//!  └──────────┴──► cancelled
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move order from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the customer, awaiting processing.
    #[default]
    New,
    /// Being picked and packed.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled; stock has been returned.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Stable code used in URLs, the CLI and the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::New => "New order",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// One-line description shown to customers.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::New => "Order placed, awaiting processing",
            Self::Processing => "Order is being prepared by a manager",
            Self::Shipped => "Parcel handed to the delivery service",
            Self::Delivered => "Parcel received by the customer",
            Self::Cancelled => "Order cancelled",
        }
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] if the lifecycle forbids it.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Customers may cancel their own order only before processing starts.
    #[must_use]
    pub const fn is_cancellable_by_customer(self) -> bool {
        matches!(self, Self::New)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_new() {
        assert_eq!(OrderStatus::default(), OrderStatus::New);
    }

    #[test]
    fn test_codes_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.code().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_refused_transitions() {
        let err = OrderStatus::Shipped
            .transition_to(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Shipped);
        assert_eq!(err.to, OrderStatus::Cancelled);
        assert_eq!(err.to_string(), "cannot move order from shipped to cancelled");

        assert!(!OrderStatus::New.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Processing));
        for status in OrderStatus::ALL {
            assert!(!OrderStatus::Cancelled.can_transition_to(status));
        }
    }

    #[test]
    fn test_terminal_and_customer_cancel() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::New.is_cancellable_by_customer());
        assert!(!OrderStatus::Processing.is_cancellable_by_customer());
    }
}
