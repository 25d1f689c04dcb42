//! Pool and Market Fetching
//!
//! Parsing of the market package's on-ledger objects (Move `fields` as
//! returned by the fullnode) into engine types.

use corner_core::{Amount, LedgerError, MarketId, ObjectId};
use serde_json::Value;

use crate::constants::{coin_types, market_state};
use crate::state::{MarketStatus, Pool, Side};

/// What the engine needs from a market object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRecord {
    pub status: MarketStatus,
    pub pool_id: ObjectId,
    /// `MarketYes` wrapper, needed by join and YES redemption
    pub yes_wrapper_id: Option<ObjectId>,
    /// `MarketNo` wrapper, needed by join and NO redemption
    pub no_wrapper_id: Option<ObjectId>,
}

fn parse_error(message: impl Into<String>) -> LedgerError {
    LedgerError::ParseError(message.into())
}

fn field<'a>(fields: &'a Value, name: &str) -> Result<&'a Value, LedgerError> {
    fields
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| parse_error(format!("missing field `{}`", name)))
}

/// Integer that may arrive as a string, a number, a `Balance` (`{ value }`)
/// or a nested `{ fields: { value } }`
fn parse_integer(value: &Value, name: &str) -> Result<u128, LedgerError> {
    match value {
        Value::String(s) => s
            .parse::<u128>()
            .map_err(|_| parse_error(format!("`{}` is not an integer: {}", name, s))),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| parse_error(format!("`{}` is not an unsigned integer", name))),
        Value::Object(map) => {
            if let Some(inner) = map.get("value") {
                parse_integer(inner, name)
            } else if let Some(inner) = map.get("fields") {
                parse_integer(inner, name)
            } else {
                Err(parse_error(format!("`{}` has no value", name)))
            }
        }
        _ => Err(parse_error(format!("`{}` has unexpected type", name))),
    }
}

fn parse_amount(fields: &Value, name: &str) -> Result<Amount, LedgerError> {
    let raw = parse_integer(field(fields, name)?, name)?;
    Amount::try_from(raw).map_err(|_| parse_error(format!("`{}` exceeds u64", name)))
}

/// Object ID given as a string or as `{ id }`
fn parse_id(value: &Value, name: &str) -> Result<ObjectId, LedgerError> {
    match value {
        Value::String(s) => ObjectId::parse(s),
        Value::Object(map) => match map.get("id") {
            Some(inner) => parse_id(inner, name),
            None => Err(parse_error(format!("`{}` has no id", name))),
        },
        _ => Err(parse_error(format!("`{}` is not an object ID", name))),
    }
}

fn optional_id(fields: &Value, name: &str) -> Result<Option<ObjectId>, LedgerError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_id(value, name).map(Some),
    }
}

/// Parse a `MarketPool` object's fields.
///
/// `k` is recomputed from the balances; a stored `k` that disagrees is
/// logged and ignored.
pub fn parse_pool(market_id: &MarketId, fields: &Value) -> Result<Pool, LedgerError> {
    if let Some(Value::String(owner)) = fields.get("market_id") {
        if !owner.eq_ignore_ascii_case(market_id.as_str()) {
            return Err(parse_error(format!(
                "pool belongs to market {}, not {}",
                owner, market_id
            )));
        }
    }

    let yes_balance = parse_amount(fields, "yes_balance")?;
    let no_balance = parse_amount(fields, "no_balance")?;
    let collateral = parse_amount(fields, "collateral")?;
    let k = yes_balance as u128 * no_balance as u128;

    if let Some(stored) = fields.get("k") {
        let stored = parse_integer(stored, "k")?;
        if stored != k {
            tracing::warn!(
                "Pool of {} reports k={} but balances give {}",
                market_id,
                stored,
                k
            );
        }
    }

    Ok(Pool::from_parts(
        market_id.clone(),
        yes_balance,
        no_balance,
        k,
        collateral,
    ))
}

fn side_from_coin_type(coin_type: &str) -> Result<Side, LedgerError> {
    if coin_type.contains(coin_types::YES_MARKER) {
        Ok(Side::Yes)
    } else if coin_type.contains(coin_types::NO_MARKER) {
        Ok(Side::No)
    } else {
        Err(parse_error(format!("unknown winning coin type: {}", coin_type)))
    }
}

/// `Option<vector<u8>>` holding the winning coin type, or a plain string
fn parse_winning_side(value: &Value) -> Result<Option<Side>, LedgerError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s == "0x1::option::none" || s.is_empty() => Ok(None),
        Value::String(s) => match s.as_str() {
            "yes" => Ok(Some(Side::Yes)),
            "no" => Ok(Some(Side::No)),
            _ => side_from_coin_type(s).map(Some),
        },
        Value::Object(map) => {
            let vec = map
                .get("fields")
                .and_then(|f| f.get("vec"))
                .or_else(|| map.get("vec"))
                .and_then(Value::as_array)
                .ok_or_else(|| parse_error("winning_coin_type is not an option"))?;
            if vec.is_empty() {
                return Ok(None);
            }
            let bytes = vec
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| parse_error("winning_coin_type is not a byte vector"))?;
            let coin_type = String::from_utf8(bytes)
                .map_err(|_| parse_error("winning_coin_type is not UTF-8"))?;
            side_from_coin_type(&coin_type).map(Some)
        }
        _ => Err(parse_error("winning_coin_type has unexpected type")),
    }
}

fn parse_state(value: &Value) -> Result<bool, LedgerError> {
    match value {
        Value::String(s) if s.eq_ignore_ascii_case("open") => Ok(false),
        Value::String(s) if s.eq_ignore_ascii_case("resolved") => Ok(true),
        other => match parse_integer(other, "state")? {
            s if s == market_state::OPEN as u128 => Ok(false),
            s if s == market_state::RESOLVED as u128 => Ok(true),
            s => Err(parse_error(format!("unknown market state {}", s))),
        },
    }
}

/// Parse a `Market` object's fields
pub fn parse_market(fields: &Value) -> Result<MarketRecord, LedgerError> {
    let resolved = parse_state(field(fields, "state")?)?;

    let status = if resolved {
        let winning = match fields.get("winning_side") {
            Some(value) if !value.is_null() => parse_winning_side(value)?,
            _ => parse_winning_side(fields.get("winning_coin_type").unwrap_or(&Value::Null))?,
        };
        let winning_side =
            winning.ok_or_else(|| parse_error("resolved market has no winning side"))?;
        MarketStatus::Resolved { winning_side }
    } else {
        MarketStatus::Open
    };

    // Markets created before pools existed have no pool_id and cannot trade
    let pool_id = parse_id(field(fields, "pool_id")?, "pool_id")?;

    Ok(MarketRecord {
        status,
        pool_id,
        yes_wrapper_id: optional_id(fields, "market_yes_id")?,
        no_wrapper_id: optional_id(fields, "market_no_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MARKET: &str = "0x5d1";

    #[test]
    fn test_parse_pool_balance_wrappers() {
        let fields = json!({
            "market_id": MARKET,
            "yes_balance": { "type": "0x2::balance::Balance", "fields": { "value": "60000000000" } },
            "no_balance": { "value": "40000000000" },
            "k": "2400000000000000000000",
            "collateral": { "value": "100000000000" }
        });

        let pool = parse_pool(&MarketId::new(MARKET), &fields).unwrap();
        assert_eq!(pool.yes_balance(), 60_000_000_000);
        assert_eq!(pool.no_balance(), 40_000_000_000);
        assert_eq!(pool.k(), 2_400_000_000_000_000_000_000);
        assert_eq!(pool.collateral(), 100_000_000_000);
    }

    #[test]
    fn test_parse_pool_plain_numbers_and_stale_k() {
        let fields = json!({
            "yes_balance": 3,
            "no_balance": "4",
            "k": "99",
            "collateral": 7
        });
        let pool = parse_pool(&MarketId::new(MARKET), &fields).unwrap();
        assert_eq!(pool.k(), 12);
    }

    #[test]
    fn test_parse_pool_rejects_foreign_market() {
        let fields = json!({
            "market_id": "0xother",
            "yes_balance": "1",
            "no_balance": "1",
            "collateral": "2"
        });
        assert!(matches!(
            parse_pool(&MarketId::new(MARKET), &fields),
            Err(LedgerError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_pool_missing_or_malformed() {
        let missing = json!({ "yes_balance": "1", "no_balance": "1" });
        assert!(parse_pool(&MarketId::new(MARKET), &missing).is_err());

        let negative = json!({ "yes_balance": "-1", "no_balance": "1", "collateral": "2" });
        assert!(parse_pool(&MarketId::new(MARKET), &negative).is_err());

        let too_big = json!({
            "yes_balance": "18446744073709551616",
            "no_balance": "1",
            "collateral": "2"
        });
        assert!(parse_pool(&MarketId::new(MARKET), &too_big).is_err());
    }

    #[test]
    fn test_parse_open_market() {
        let fields = json!({
            "state": "0",
            "winning_coin_type": null,
            "pool_id": "0xAB",
            "market_yes_id": { "id": "0x1" }
        });
        let record = parse_market(&fields).unwrap();
        assert_eq!(record.status, MarketStatus::Open);
        assert_eq!(record.pool_id.as_str(), "0xab");
        assert_eq!(record.yes_wrapper_id.unwrap().as_str(), "0x1");
        assert!(record.no_wrapper_id.is_none());
    }

    #[test]
    fn test_parse_resolved_market_from_option_bytes() {
        let coin_type = "0xabc::no_coin::NO_COIN";
        let fields = json!({
            "state": 1,
            "winning_coin_type": {
                "type": "0x1::option::Option<vector<u8>>",
                "fields": { "vec": coin_type.as_bytes() }
            },
            "pool_id": { "id": "0x77" }
        });
        let record = parse_market(&fields).unwrap();
        assert_eq!(
            record.status,
            MarketStatus::Resolved {
                winning_side: Side::No
            }
        );
    }

    #[test]
    fn test_parse_resolved_market_from_string() {
        let fields = json!({
            "state": "resolved",
            "winning_coin_type": "0xabc::yes_coin::YES_COIN",
            "pool_id": "0x77"
        });
        assert_eq!(
            parse_market(&fields).unwrap().status.winning_side(),
            Some(Side::Yes)
        );
    }

    #[test]
    fn test_parse_market_errors() {
        // Resolved without a winner
        let fields = json!({ "state": "1", "pool_id": "0x77" });
        assert!(parse_market(&fields).is_err());

        // No pool
        let fields = json!({ "state": "0" });
        assert!(parse_market(&fields).is_err());

        // Unknown state
        let fields = json!({ "state": "7", "pool_id": "0x77" });
        assert!(parse_market(&fields).is_err());
    }
}
