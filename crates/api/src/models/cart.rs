//! Cart view types.

use rust_decimal::Decimal;
use serde::Serialize;

use super::catalog::ProductSummary;

/// One cart line joined with live product data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: ProductSummary,
    pub qty: i32,
    /// Live unit price x qty.
    pub line_total: Decimal,
}

/// The whole cart as returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Sum of all line totals at live prices.
    pub total: Decimal,
}

impl CartView {
    /// Build a view from joined lines, deriving line and cart totals.
    #[must_use]
    pub fn from_lines(lines: Vec<(ProductSummary, i32)>) -> Self {
        let items: Vec<CartLine> = lines
            .into_iter()
            .map(|(product, qty)| {
                let line_total = product.price * Decimal::from(qty);
                CartLine {
                    product,
                    qty,
                    line_total,
                }
            })
            .collect();
        let total = items.iter().map(|line| line.line_total).sum();
        Self { items, total }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marigold_core::ProductId;

    fn summary(id: i32, price: Decimal) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price,
            images: vec![],
        }
    }

    #[test]
    fn totals_are_price_times_qty_summed() {
        let view = CartView::from_lines(vec![
            (summary(1, Decimal::new(19999, 2)), 2), // 199.99 x 2
            (summary(2, Decimal::new(5000, 2)), 1),  // 50.00
        ]);
        assert_eq!(view.items.len(), 2);
        let first = view.items.first().unwrap();
        assert_eq!(first.line_total, Decimal::new(39998, 2));
        assert_eq!(view.total, Decimal::new(44998, 2));
    }

    #[test]
    fn empty_cart_totals_zero() {
        let view = CartView::from_lines(vec![]);
        assert!(view.items.is_empty());
        assert_eq!(view.total, Decimal::ZERO);
    }
}
