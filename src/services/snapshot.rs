use crate::{
    errors::ServiceError,
    models::{cart::Cart, order::OrderLine},
};

/// Freezes the cart into order-line candidates. Prices are whatever the cart
/// recorded at add time; nothing here re-reads the catalog.
pub fn snapshot(cart: &Cart) -> Result<Vec<OrderLine>, ServiceError> {
    if cart.is_empty() {
        return Err(ServiceError::EmptyCart);
    }
    Ok(cart
        .lines
        .iter()
        .map(|line| OrderLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            selected_options: line.selected_options.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_cart_is_rejected() {
        let err = snapshot(&Cart::default()).unwrap_err();
        assert!(matches!(err, ServiceError::EmptyCart));
    }

    #[test]
    fn lines_are_copied_verbatim() {
        let mut cart = Cart::default();
        cart.add_line(7, "Latte", dec!(38000), 2, "oat milk");
        let lines = snapshot(&cart).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, 7);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price, dec!(38000));
        assert_eq!(lines[0].selected_options, "oat milk");
    }
}
