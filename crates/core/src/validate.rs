//! Boundary validation for user supplied names and amounts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::ValidationError, names::PlayerName, Amount};

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[^\d\s.,+-]{0,3}\s*([+-]?\d[\d,]*(?:\.\d+)?|[+-]?\.\d+)\s*$")
        .expect("invalid amount regex")
});

/// Canonicalise a name, rejecting blank input.
pub fn player_name(raw: &str) -> Result<PlayerName, ValidationError> {
    let name = PlayerName::new(raw);
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name)
}

/// Parse free-form amount text such as `1,500`, `₹500` or `$ 20.5`.
pub fn parse_amount(raw: &str) -> Result<Amount, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(raw.trim().to_string());
    let caps = AMOUNT_RE.captures(raw).ok_or_else(invalid)?;
    let digits = caps
        .get(1)
        .map(|m| m.as_str().replace(',', ""))
        .ok_or_else(invalid)?;
    let value = digits.parse::<Amount>().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

/// Buy-ins must be strictly positive.
pub fn buy_in_amount(amount: Amount) -> Result<Amount, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }
    if amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

/// Cash-outs may be zero (busted) but never negative.
pub fn cash_out_amount(amount: Amount) -> Result<Amount, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }
    if amount < 0.0 {
        return Err(ValidationError::NegativeAmount(amount));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_amount_formats() {
        assert_eq!(parse_amount("500"), Ok(500.0));
        assert_eq!(parse_amount(" 1,500 "), Ok(1500.0));
        assert_eq!(parse_amount("₹500"), Ok(500.0));
        assert_eq!(parse_amount("$ 20.5"), Ok(20.5));
        assert_eq!(parse_amount("-40"), Ok(-40.0));
        assert_eq!(parse_amount(".5"), Ok(0.5));
    }

    #[test]
    fn rejects_junk_amounts() {
        for input in ["", "abc", "12abc", "1.2.3", "--5", "NaN", "inf"] {
            assert!(
                matches!(parse_amount(input), Err(ValidationError::InvalidAmount(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn buy_in_must_be_positive() {
        assert_eq!(buy_in_amount(100.0), Ok(100.0));
        assert_eq!(buy_in_amount(0.0), Err(ValidationError::NonPositiveAmount(0.0)));
        assert_eq!(
            buy_in_amount(-5.0),
            Err(ValidationError::NonPositiveAmount(-5.0))
        );
        assert!(buy_in_amount(Amount::NAN).is_err());
    }

    #[test]
    fn cash_out_allows_zero() {
        assert_eq!(cash_out_amount(0.0), Ok(0.0));
        assert_eq!(cash_out_amount(-1.0), Err(ValidationError::NegativeAmount(-1.0)));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(player_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(player_name("sNEHA").map(|n| n.to_string()), Ok("Sneha".to_string()));
    }
}
