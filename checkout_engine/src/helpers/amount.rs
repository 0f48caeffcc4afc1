use serde_json::Value;

use crate::{checkout_api::errors::CheckoutError, db_types::Paise};

/// Accepts only a JSON integer greater than zero. Floats, strings, booleans, nulls and non-positive numbers are all
/// rejected with [`CheckoutError::InvalidAmount`].
pub fn parse_amount(value: &Value) -> Result<Paise, CheckoutError> {
    match value.as_i64() {
        Some(v) if v > 0 => Ok(Paise::from(v)),
        _ => Err(CheckoutError::InvalidAmount(value.to_string())),
    }
}
