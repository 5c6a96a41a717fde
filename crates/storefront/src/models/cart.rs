//! Cart types.
//!
//! Guests keep a [`SessionCart`] in their session; logged-in customers have
//! `cart`/`cart_item` rows. Both are presented as the same [`CartView`].

use serde::{Deserialize, Serialize};

use voentorg_core::{
    Price, ProductId, QuantityAdjustment, clamp_to_stock, merge_quantities,
};

/// One guest cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Guest cart stored in the session under `session_keys::CART`.
///
/// Lines keep insertion order and hold at most one entry per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCart {
    lines: Vec<SessionCartLine>,
}

impl SessionCart {
    #[must_use]
    pub fn lines(&self) -> &[SessionCartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Quantity currently held for `product_id` (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Product IDs in the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Add `quantity` units on top of what the line holds, clamped to `stock`.
    ///
    /// An out-of-stock outcome leaves the cart unchanged.
    pub fn add(&mut self, product_id: ProductId, quantity: u32, stock: u32) -> QuantityAdjustment {
        let adjustment = merge_quantities(self.quantity_of(product_id), quantity, stock);
        if let Some(held) = adjustment.quantity() {
            self.put(product_id, held);
        }
        adjustment
    }

    /// Set the line to `quantity` units, clamped to `stock`.
    ///
    /// Zero removes the line. A product not yet in the cart is added.
    pub fn set(&mut self, product_id: ProductId, quantity: u32, stock: u32) -> QuantityAdjustment {
        if quantity == 0 {
            self.remove(product_id);
            return QuantityAdjustment::Accepted { quantity: 0 };
        }
        let adjustment = clamp_to_stock(quantity, stock);
        if let Some(held) = adjustment.quantity() {
            self.put(product_id, held);
        }
        adjustment
    }

    /// Remove a line. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn put(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(SessionCartLine {
                product_id,
                quantity,
            }),
        }
    }
}

/// A priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    /// Units currently in stock.
    pub stock: u32,
    pub is_available: bool,
}

impl CartLine {
    #[must_use]
    pub fn new(
        product_id: ProductId,
        name: String,
        slug: String,
        unit_price: Price,
        quantity: u32,
        stock: u32,
        is_available: bool,
    ) -> Self {
        Self {
            product_id,
            name,
            slug,
            unit_price,
            quantity,
            line_total: unit_price.times(quantity),
            stock,
            is_available,
        }
    }
}

/// A cart mutation that gave the customer less than asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartNotice {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub adjustment: QuantityAdjustment,
}

impl CartNotice {
    /// A notice for `adjustment`, or `None` if nothing was reduced.
    #[must_use]
    pub const fn from_adjustment(
        product_id: ProductId,
        adjustment: QuantityAdjustment,
    ) -> Option<Self> {
        if adjustment.is_reduced() {
            Some(Self {
                product_id,
                adjustment,
            })
        } else {
            None
        }
    }
}

/// Cart as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total_items: u32,
    pub total_price: Price,
    /// Non-fatal adjustments made by the last mutation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<CartNotice>,
}

impl CartView {
    #[must_use]
    pub fn new(lines: Vec<CartLine>) -> Self {
        let total_items = lines.iter().map(|l| l.quantity).sum();
        let total_price = lines.iter().map(|l| l.line_total).sum();
        Self {
            lines,
            total_items,
            total_price,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Attach the notice for `adjustment`, if any.
    #[must_use]
    pub fn with_adjustment(mut self, product_id: ProductId, adjustment: QuantityAdjustment) -> Self {
        self.notices
            .extend(CartNotice::from_adjustment(product_id, adjustment));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BOOTS: ProductId = ProductId::new(1);
    const CAP: ProductId = ProductId::new(2);

    #[test]
    fn test_add_accumulates_and_clamps() {
        let mut cart = SessionCart::default();
        assert_eq!(
            cart.add(BOOTS, 2, 5),
            QuantityAdjustment::Accepted { quantity: 2 }
        );
        assert_eq!(
            cart.add(BOOTS, 4, 5),
            QuantityAdjustment::Clamped {
                requested: 6,
                quantity: 5
            }
        );
        assert_eq!(cart.quantity_of(BOOTS), 5);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_sold_out_leaves_cart_unchanged() {
        let mut cart = SessionCart::default();
        cart.add(CAP, 1, 3);
        assert_eq!(cart.add(BOOTS, 1, 0), QuantityAdjustment::OutOfStock);
        assert_eq!(cart.product_ids(), vec![CAP]);
    }

    #[test]
    fn test_set_zero_removes_and_missing_adds() {
        let mut cart = SessionCart::default();
        cart.set(BOOTS, 3, 10);
        assert_eq!(cart.quantity_of(BOOTS), 3);

        cart.set(BOOTS, 1, 10);
        assert_eq!(cart.quantity_of(BOOTS), 1);

        cart.set(BOOTS, 0, 10);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut cart = SessionCart::default();
        cart.add(BOOTS, 1, 10);
        assert!(cart.remove(BOOTS));
        assert!(!cart.remove(BOOTS));
    }

    #[test]
    fn test_totals_and_clear() {
        let mut cart = SessionCart::default();
        cart.add(BOOTS, 2, 10);
        cart.add(CAP, 3, 10);
        assert_eq!(cart.total_items(), 5);
        cart.clear();
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_session_cart_survives_json() {
        let mut cart = SessionCart::default();
        cart.add(BOOTS, 2, 10);
        let value = serde_json::to_value(&cart).unwrap();
        let restored: SessionCart = serde_json::from_value(value).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::new(vec![
            CartLine::new(BOOTS, "Boots".into(), "boots".into(), Price::from_minor(459_900), 2, 5, true),
            CartLine::new(CAP, "Cap".into(), "cap".into(), Price::from_minor(50_000), 1, 5, true),
        ]);
        assert_eq!(view.total_items, 3);
        assert_eq!(view.total_price, Price::from_minor(969_800));
    }

    #[test]
    fn test_notices_only_for_reduced_quantities() {
        let view = CartView::empty()
            .with_adjustment(BOOTS, QuantityAdjustment::Accepted { quantity: 1 })
            .with_adjustment(CAP, QuantityAdjustment::OutOfStock);
        assert_eq!(view.notices.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["notices"][0]["product_id"], 2);
        assert_eq!(json["notices"][0]["outcome"], "out_of_stock");
    }
}
