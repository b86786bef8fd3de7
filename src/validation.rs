// Validation utilities module
// Provides custom validation functions for domain-specific rules

use rust_decimal::Decimal;
use validator::ValidationError;

/// Validates that a tonnes quantity is strictly positive.
/// Cart additions of zero or negative tonnes are rejected.
pub fn validate_positive_tonnes(tonnes: &Decimal) -> Result<(), ValidationError> {
    if *tonnes > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("tonnes_must_be_positive"))
    }
}

/// Validates that a month number is between 1 and 12
pub fn validate_month(month: u32) -> Result<(), ValidationError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ValidationError::new("month_out_of_range"))
    }
}
