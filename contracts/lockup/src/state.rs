use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use cosmwasm_std::{Addr, Uint128};
use cw_storage_plus::{Item, Map};

pub const DEFAULT_MIN_LOCK_MONTHS: u32 = 6;
pub const DEFAULT_MAX_LOCK_MONTHS: u32 = 24;
pub const DEFAULT_MAX_ENTRIES_PER_MSG: u32 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Config {
    /// Account allowed to update the config
    pub authority: Addr,
    /// Shortest lock horizon, in months from the current ledger day
    pub min_lock_months: u32,
    /// Longest lock horizon, in months from the current ledger day
    pub max_lock_months: u32,
    /// Cap on extensions / outputs carried by a single message
    pub max_entries_per_msg: u32,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const ACCOUNTS: Map<&Addr, Account> = Map::new("accounts");
pub const NEXT_ACCOUNT_NUMBER: Item<u64> = Item::new("next_account_number");

/// (unlock unix seconds, account) -> amount unlocking that day.
/// The u64 prefix is stored big-endian, so ranges iterate in unlock order.
pub const EXPIRATION_QUEUE: Map<(u64, &Addr), Uint128> = Map::new("lock_expiration");
pub const TOTAL_LOCKED: Item<Uint128> = Item::new("total_locked");
