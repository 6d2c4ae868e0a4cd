//! Items

/// A product code and how many of it are in the cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    product_code: String,
    quantity: u32,
}

impl LineItem {
    /// Creates a new line item
    pub fn new(product_code: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
        }
    }

    /// Returns the product code of the item
    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    /// Returns the accumulated quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Adds to the quantity, returning the new total, or `None` (leaving the item untouched)
    /// if the total would overflow.
    pub(crate) fn add_quantity(&mut self, quantity: u32) -> Option<u32> {
        self.quantity = self.quantity.checked_add(quantity)?;

        Some(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_quantity_accumulates() {
        let mut item = LineItem::new("apple", 1);

        assert_eq!(item.add_quantity(2), Some(3));
        assert_eq!(item.quantity(), 3);
    }

    #[test]
    fn add_quantity_overflow_leaves_item_untouched() {
        let mut item = LineItem::new("apple", u32::MAX);

        assert_eq!(item.add_quantity(1), None);
        assert_eq!(item.quantity(), u32::MAX);
    }
}
