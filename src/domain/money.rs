//! Conversions between display amounts and the gateway's integer minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{AppError, Result};

/// Number of decimal places the currency's minor unit represents.
pub fn minor_unit_exponent(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" | "PYG" => 0,
        "BHD" | "KWD" | "OMR" | "JOD" | "TND" | "IQD" | "LYD" => 3,
        _ => 2,
    }
}

/// `500 INR` becomes `50000` paise. Fractions finer than the minor unit are
/// rejected rather than rounded.
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::Validation("Amount must be non-negative".to_string()));
    }

    let scale = Decimal::from(10i64.pow(minor_unit_exponent(currency)));
    let minor = amount
        .checked_mul(scale)
        .ok_or_else(|| AppError::Validation("Amount is too large".to_string()))?;

    if !minor.fract().is_zero() {
        return Err(AppError::Validation(format!(
            "Amount {} has more precision than {} allows",
            amount, currency
        )));
    }

    minor
        .to_i64()
        .ok_or_else(|| AppError::Validation("Amount is too large".to_string()))
}

/// Currency codes are stored upper-case, three ASCII letters.
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!("Invalid currency code: {}", code)));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_price_converts_to_paise() {
        assert_eq!(to_minor_units(Decimal::new(500, 0), "INR").unwrap(), 50000);
        assert_eq!(to_minor_units(Decimal::new(49999, 2), "inr").unwrap(), 49999);
        assert_eq!(to_minor_units(Decimal::ZERO, "INR").unwrap(), 0);
    }

    #[test]
    fn test_zero_decimal_currency() {
        assert_eq!(to_minor_units(Decimal::new(1200, 0), "JPY").unwrap(), 1200);
        assert!(to_minor_units(Decimal::new(12005, 1), "JPY").is_err());
    }

    #[test]
    fn test_rejects_negative_and_sub_minor_amounts() {
        assert!(to_minor_units(Decimal::new(-1, 0), "INR").is_err());
        assert!(to_minor_units(Decimal::new(1001, 3), "INR").is_err());
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(" usd ").unwrap(), "USD");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U$D").is_err());
    }
}
