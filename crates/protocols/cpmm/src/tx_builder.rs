//! CPMM Transaction Builder
//!
//! Turns a pool [`Operation`] into the market package's Move entry call.
//! The signer splits the input coins out of the sender's holdings.

use corner_core::{LedgerError, ObjectId};
use serde::Serialize;
use sui_client::{MoveArg, MoveCall};

use crate::constants::{coin_type, coin_types, entry, entry_target};
use crate::fetch::MarketRecord;
use crate::state::{Operation, Side};

/// Build result containing the Move call and a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallBuildResult {
    pub call: MoveCall,
    pub summary: CallSummary,
}

/// Summary of the call for logs and the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSummary {
    pub function: &'static str,
    pub market: ObjectId,
    pub pool: ObjectId,
    /// Coin types spent, with amounts
    pub inputs: Vec<(String, u64)>,
    /// Slippage guard, swaps only
    pub min_out: Option<u64>,
}

fn object(id: &ObjectId) -> MoveArg {
    MoveArg::Object {
        id: id.as_str().to_string(),
    }
}

fn wrapper(
    market: &ObjectId,
    id: Option<&ObjectId>,
    side: Side,
) -> Result<MoveArg, LedgerError> {
    id.map(object).ok_or_else(|| LedgerError::ObjectNotFound {
        id: format!("{} wrapper of market {}", side, market),
    })
}

/// Build the entry call for `operation` on `market`.
///
/// # Arguments
///
/// * `package_id` - Market package the entry functions live in
/// * `market` - Market object ID
/// * `record` - Parsed market object (pool and wrapper IDs)
/// * `operation` - What to execute
///
/// Join and redeem need the market's YES/NO wrapper objects; a market
/// without them fails with `ObjectNotFound`.
pub fn build_move_call(
    package_id: &str,
    market: &ObjectId,
    record: &MarketRecord,
    operation: &Operation,
) -> Result<CallBuildResult, LedgerError> {
    let yes_type = coin_type(package_id, coin_types::YES);
    let no_type = coin_type(package_id, coin_types::NO);
    let coin = |coin_type: &str, amount: u64| MoveArg::Coin {
        coin_type: coin_type.to_string(),
        amount,
    };

    let mut arguments = vec![object(market), object(&record.pool_id)];
    let mut inputs = Vec::new();
    let mut min_out = None;

    let function = match *operation {
        Operation::Split { usdo_in } => {
            let usdo_type = coin_type(package_id, coin_types::USDO);
            arguments.push(coin(&usdo_type, usdo_in));
            inputs.push((usdo_type, usdo_in));
            entry::SPLIT
        }
        Operation::SwapYesForNo { yes_in, min_no_out } => {
            arguments.push(coin(&yes_type, yes_in));
            arguments.push(MoveArg::U64 { value: min_no_out });
            inputs.push((yes_type, yes_in));
            min_out = Some(min_no_out);
            entry::SWAP_YES_FOR_NO
        }
        Operation::SwapNoForYes { no_in, min_yes_out } => {
            arguments.push(coin(&no_type, no_in));
            arguments.push(MoveArg::U64 { value: min_yes_out });
            inputs.push((no_type, no_in));
            min_out = Some(min_yes_out);
            entry::SWAP_NO_FOR_YES
        }
        Operation::Join { yes_in, no_in } => {
            arguments.push(wrapper(market, record.yes_wrapper_id.as_ref(), Side::Yes)?);
            arguments.push(wrapper(market, record.no_wrapper_id.as_ref(), Side::No)?);
            arguments.push(coin(&yes_type, yes_in));
            arguments.push(coin(&no_type, no_in));
            inputs.push((yes_type, yes_in));
            inputs.push((no_type, no_in));
            entry::JOIN
        }
        Operation::Redeem {
            side: Side::Yes,
            amount,
        } => {
            arguments.push(wrapper(market, record.yes_wrapper_id.as_ref(), Side::Yes)?);
            arguments.push(coin(&yes_type, amount));
            inputs.push((yes_type, amount));
            entry::REDEEM_YES
        }
        Operation::Redeem {
            side: Side::No,
            amount,
        } => {
            arguments.push(wrapper(market, record.no_wrapper_id.as_ref(), Side::No)?);
            arguments.push(coin(&no_type, amount));
            inputs.push((no_type, amount));
            entry::REDEEM_NO
        }
    };

    Ok(CallBuildResult {
        call: MoveCall {
            target: entry_target(package_id, function),
            type_arguments: Vec::new(),
            arguments,
        },
        summary: CallSummary {
            function,
            market: market.clone(),
            pool: record.pool_id.clone(),
            inputs,
            min_out,
        },
    })
}
