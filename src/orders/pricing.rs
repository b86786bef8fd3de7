use rust_decimal::Decimal;

/// Price math for checkout
pub struct PriceCalculator;

impl PriceCalculator {
    /// Cost of one cart line
    ///
    /// # Arguments
    /// * `tonnes` - Quantity of offsets in the line
    /// * `price_per_tonne` - Catalog price at checkout time
    ///
    /// # Returns
    /// Line cost as Decimal (tonnes * price_per_tonne)
    pub fn line_total(tonnes: Decimal, price_per_tonne: Decimal) -> Decimal {
        tonnes * price_per_tonne
    }

    /// Total order amount across all lines
    pub fn order_total(line_totals: &[Decimal]) -> Decimal {
        line_totals.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_total_basic() {
        assert_eq!(PriceCalculator::line_total(dec!(3), dec!(50)), dec!(150));
    }

    #[test]
    fn test_line_total_fractional_tonnes() {
        assert_eq!(PriceCalculator::line_total(dec!(0.5), dec!(50)), dec!(25.0));
    }

    #[test]
    fn test_order_total_multiple_lines() {
        let totals = vec![dec!(150), dec!(100)];
        assert_eq!(PriceCalculator::order_total(&totals), dec!(250));
    }

    #[test]
    fn test_order_total_empty() {
        let totals: Vec<Decimal> = vec![];
        assert_eq!(PriceCalculator::order_total(&totals), dec!(0));
    }
}
