use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Hard cap on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 10;

/// One product/options combination with a unit price frozen at the moment it
/// was added. Lives in the session-keyed [`CartStore`](crate::repositories::CartStore),
/// never in durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Free-form customization string; distinguishes lines for the same
    /// product with different options.
    #[serde(default)]
    pub selected_options: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Adds a line, merging with an existing one only when both the product
    /// id and the selected-options string match exactly (empty equals empty).
    pub fn add_line(
        &mut self,
        product_id: i64,
        name: &str,
        unit_price: Decimal,
        quantity: i32,
        selected_options: &str,
    ) {
        let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.selected_options == selected_options)
        {
            existing.quantity = (existing.quantity + quantity).min(MAX_LINE_QUANTITY);
        } else {
            self.lines.push(CartLine {
                product_id,
                name: name.to_string(),
                unit_price,
                quantity,
                selected_options: selected_options.to_string(),
            });
        }
    }

    /// Sets the quantity on every line for the product. Returns false when no
    /// line matched.
    pub fn set_quantity(&mut self, product_id: i64, quantity: i32) -> bool {
        let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
        let mut matched = false;
        for line in self.lines.iter_mut().filter(|l| l.product_id == product_id) {
            line.quantity = quantity;
            matched = true;
        }
        matched
    }

    /// Removes lines for the product. An empty options string removes every
    /// line for the product regardless of customization; otherwise only the
    /// exact product/options match is dropped.
    pub fn remove_line(&mut self, product_id: i64, selected_options: &str) {
        if selected_options.is_empty() {
            self.lines.retain(|l| l.product_id != product_id);
        } else {
            self.lines
                .retain(|l| !(l.product_id == product_id && l.selected_options == selected_options));
        }
    }

    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum()
    }

    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
