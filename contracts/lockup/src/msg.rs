use chrono::NaiveDate;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Uint128};

use crate::schedule::Lock;
use crate::state::Config;
use crate::tx::Tx;

#[cw_serde]
#[derive(Default)]
pub struct InstantiateMsg {
    /// Account allowed to update the config, defaults to the instantiator
    pub authority: Option<String>,
    /// Shortest lock horizon in months, defaults to 6
    pub min_lock_months: Option<u32>,
    /// Longest lock horizon in months, defaults to 24
    pub max_lock_months: Option<u32>,
    /// Cap on extensions / outputs per message, defaults to 100
    pub max_entries_per_msg: Option<u32>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Lock already delegated funds of the sender. All entries together must
    /// fit in the sender's delegations.
    Lock { locks: Vec<LockEntry> },
    /// Move whole locks to later unlock dates
    Extend { extensions: Vec<Extension> },
    /// Send funds to `to_address`, delegate them on its behalf and lock them
    SendDelegateAndLock {
        to_address: String,
        validator_address: String,
        amount: Uint128,
        unlock_date: String,
    },
    /// SendDelegateAndLock fanned out over several recipients.
    /// `total_amount` must equal the sum of the outputs.
    MultiSendDelegateAndLock {
        total_amount: Uint128,
        outputs: Vec<SendDelegateAndLockOutput>,
    },
    /// Only the config authority
    UpdateConfig {
        authority: Option<String>,
        min_lock_months: Option<u32>,
        max_lock_months: Option<u32>,
        max_entries_per_msg: Option<u32>,
    },
}

#[cw_serde]
pub struct LockEntry {
    /// YYYY-MM-DD
    pub unlock_date: String,
    pub amount: Coin,
}

#[cw_serde]
pub struct Extension {
    pub from_date: String,
    pub to_date: String,
    pub amount: Coin,
}

#[cw_serde]
pub struct SendDelegateAndLockOutput {
    pub to_address: String,
    pub validator_address: String,
    pub amount: Uint128,
    pub unlock_date: String,
}

/// Privileged calls made by the host ledger around every transaction and
/// at the end of every block.
#[cw_serde]
pub enum SudoMsg {
    AnteHandle { tx: Tx },
    PostHandle { tx: Tx, simulate: bool, success: bool },
    EndBlock {},
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Config)]
    Config {},
    /// Global amount still locked
    #[returns(TotalLockedResponse)]
    TotalLocked {},
    /// Active locks of all accounts in unlock order
    #[returns(ActiveLocksResponse)]
    ActiveLocks {
        start_after: Option<LockCursor>,
        limit: Option<u32>,
        /// Only locks unlocking strictly before this date
        unlock_before: Option<String>,
    },
    /// Active locks of one account
    #[returns(LocksResponse)]
    Locks { address: String },
    #[returns(LocksForAddressesResponse)]
    LocksForAddresses { addresses: Vec<String> },
}

#[cw_serde]
pub struct TotalLockedResponse {
    pub total_locked: Coin,
}

#[cw_serde]
pub struct LockCursor {
    pub unlock_date: String,
    pub address: String,
}

#[cw_serde]
pub struct ActiveLock {
    pub address: String,
    pub unlock_date: NaiveDate,
    pub amount: Coin,
}

#[cw_serde]
pub struct ActiveLocksResponse {
    pub locks: Vec<ActiveLock>,
}

#[cw_serde]
pub struct LocksResponse {
    pub address: String,
    pub locks: Vec<Lock>,
}

#[cw_serde]
pub struct LocksForAddressesResponse {
    pub accounts: Vec<LocksResponse>,
}
