//! CPMM Constants
//!
//! On-ledger entry points and coin type names of the market package.

/// Move module and entry functions
pub mod entry {
    /// Module holding every market entry function
    pub const MODULE: &str = "markets";

    pub const SPLIT: &str = "split_usdo_for_market";
    pub const SWAP_YES_FOR_NO: &str = "swap_yes_for_no_for_market";
    pub const SWAP_NO_FOR_YES: &str = "swap_no_for_yes_for_market";
    pub const JOIN: &str = "join_coins_for_market";
    pub const REDEEM_YES: &str = "redeem_winning_yes_for_market";
    pub const REDEEM_NO: &str = "redeem_winning_no_for_market";
}

/// Coin type suffixes, appended to the package ID
pub mod coin_types {
    pub const USDO: &str = "::usdo::USDO";
    pub const YES: &str = "::yes_coin::YES_COIN";
    pub const NO: &str = "::no_coin::NO_COIN";

    /// Markers used to tell the winning coin type apart
    pub const YES_MARKER: &str = "YES_COIN";
    pub const NO_MARKER: &str = "NO_COIN";
}

/// Market object `state` field values
pub mod market_state {
    pub const OPEN: u64 = 0;
    pub const RESOLVED: u64 = 1;
}

/// Full coin type of `suffix` in `package_id`
pub fn coin_type(package_id: &str, suffix: &str) -> String {
    format!("{}{}", package_id, suffix)
}

/// `package::markets::function`
pub fn entry_target(package_id: &str, function: &str) -> String {
    format!("{}::{}::{}", package_id, entry::MODULE, function)
}
