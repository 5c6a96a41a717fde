//! Stock clamping rules shared by the session and persisted carts.
//!
//! A cart line can never hold more units than the product has in stock.
//! Asking for more is not an error: the quantity is lowered to what is
//! available and the caller tells the customer.

use serde::Serialize;

/// Outcome of fitting a requested quantity into available stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuantityAdjustment {
    /// The requested quantity fits.
    Accepted {
        /// Quantity now held.
        quantity: u32,
    },
    /// Lowered to the available stock.
    Clamped {
        /// What the customer asked for in total.
        requested: u32,
        /// Quantity now held (equals stock).
        quantity: u32,
    },
    /// Nothing can be held: the product is sold out or unavailable.
    OutOfStock,
}

impl QuantityAdjustment {
    /// Quantity the cart line should hold afterwards; `None` means no line.
    #[must_use]
    pub const fn quantity(self) -> Option<u32> {
        match self {
            Self::Accepted { quantity } | Self::Clamped { quantity, .. } => Some(quantity),
            Self::OutOfStock => None,
        }
    }

    /// Whether the customer got less than requested.
    #[must_use]
    pub const fn is_reduced(self) -> bool {
        !matches!(self, Self::Accepted { .. })
    }
}

/// Fit `requested` units into `stock`.
///
/// A `requested` of zero is treated as accepted-zero and left to the caller
/// (an update to zero removes the line).
#[must_use]
pub const fn clamp_to_stock(requested: u32, stock: u32) -> QuantityAdjustment {
    if stock == 0 && requested > 0 {
        QuantityAdjustment::OutOfStock
    } else if requested > stock {
        QuantityAdjustment::Clamped {
            requested,
            quantity: stock,
        }
    } else {
        QuantityAdjustment::Accepted {
            quantity: requested,
        }
    }
}

/// Add `incoming` units onto an `existing` line quantity and clamp the sum.
///
/// Used both for repeated add-to-cart and for merging a guest cart into a
/// customer cart at login.
#[must_use]
pub const fn merge_quantities(existing: u32, incoming: u32, stock: u32) -> QuantityAdjustment {
    clamp_to_stock(existing.saturating_add(incoming), stock)
}

/// Convert a database stock column (`INTEGER CHECK (stock >= 0)`) to `u32`.
#[must_use]
pub fn stock_from_db(stock: i32) -> u32 {
    u32::try_from(stock).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_stock_is_accepted() {
        assert_eq!(
            clamp_to_stock(3, 10),
            QuantityAdjustment::Accepted { quantity: 3 }
        );
        assert_eq!(
            clamp_to_stock(10, 10),
            QuantityAdjustment::Accepted { quantity: 10 }
        );
    }

    #[test]
    fn test_beyond_stock_is_clamped() {
        let adjustment = clamp_to_stock(12, 5);
        assert_eq!(
            adjustment,
            QuantityAdjustment::Clamped {
                requested: 12,
                quantity: 5
            }
        );
        assert_eq!(adjustment.quantity(), Some(5));
        assert!(adjustment.is_reduced());
    }

    #[test]
    fn test_sold_out_is_rejected() {
        let adjustment = clamp_to_stock(1, 0);
        assert_eq!(adjustment, QuantityAdjustment::OutOfStock);
        assert_eq!(adjustment.quantity(), None);
    }

    #[test]
    fn test_merge_adds_then_clamps() {
        assert_eq!(
            merge_quantities(2, 3, 10),
            QuantityAdjustment::Accepted { quantity: 5 }
        );
        assert_eq!(
            merge_quantities(4, 4, 6),
            QuantityAdjustment::Clamped {
                requested: 8,
                quantity: 6
            }
        );
        assert_eq!(
            merge_quantities(u32::MAX, 1, 3),
            QuantityAdjustment::Clamped {
                requested: u32::MAX,
                quantity: 3
            }
        );
    }

    #[test]
    fn test_stock_from_db_floors_negative() {
        assert_eq!(stock_from_db(7), 7);
        assert_eq!(stock_from_db(-3), 0);
    }

    #[test]
    fn test_serializes_with_outcome_tag() {
        let json = serde_json::to_value(clamp_to_stock(9, 4)).unwrap_or_default();
        assert_eq!(json["outcome"], "clamped");
        assert_eq!(json["quantity"], 4);
    }
}
