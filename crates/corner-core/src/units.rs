//! Display-unit conversion for 9-decimal amounts
//!
//! All arithmetic is integer; no floating point touches a balance.

use thiserror::Error;

use crate::constants::{BASE_UNITS_PER_USDO, USDO_DECIMALS};
use crate::Amount;

/// Errors parsing a display amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid character in amount: {0:?}")]
    InvalidCharacter(char),

    #[error("Too many decimal places (max {max})")]
    TooPrecise { max: u32 },

    #[error("Amount out of range")]
    Overflow,
}

/// Parse a display amount like `"12.5"` into base units.
pub fn parse_units(input: &str) -> Result<Amount, UnitsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Empty);
    }
    if frac.len() > USDO_DECIMALS as usize {
        return Err(UnitsError::TooPrecise {
            max: USDO_DECIMALS,
        });
    }
    if let Some(c) = whole.chars().chain(frac.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(UnitsError::InvalidCharacter(c));
    }

    let whole_units: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| UnitsError::Overflow)?
    };

    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        let scale = 10u64.pow(USDO_DECIMALS - frac.len() as u32);
        frac.parse::<Amount>().map_err(|_| UnitsError::Overflow)? * scale
    };

    whole_units
        .checked_mul(BASE_UNITS_PER_USDO)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or(UnitsError::Overflow)
}

/// Format base units as a display amount, trimming trailing zeros.
pub fn format_units(amount: Amount) -> String {
    let whole = amount / BASE_UNITS_PER_USDO;
    let frac = amount % BASE_UNITS_PER_USDO;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = USDO_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
