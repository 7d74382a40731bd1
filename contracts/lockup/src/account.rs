use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::{Addr, Binary, StdResult, Storage};

use crate::error::ContractError;
use crate::schedule::LockSchedule;
use crate::state::{ACCOUNTS, NEXT_ACCOUNT_NUMBER};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct BaseAccount {
    pub address: Addr,
    pub pub_key: Option<Binary>,
    pub account_number: u64,
    pub sequence: u64,
}

/// A base account carrying a lock schedule. Identity fields are inherited
/// from the account it was upgraded from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct LockupAccount {
    pub base: BaseAccount,
    locks: LockSchedule,
}

impl LockupAccount {
    pub fn new(base: BaseAccount) -> Self {
        LockupAccount {
            base,
            locks: LockSchedule::default(),
        }
    }

    pub fn address(&self) -> &Addr {
        &self.base.address
    }

    pub fn schedule(&self) -> &LockSchedule {
        &self.locks
    }

    pub(crate) fn schedule_mut(&mut self) -> &mut LockSchedule {
        &mut self.locks
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    Base(BaseAccount),
    Lockup(LockupAccount),
}

impl Account {
    pub fn address(&self) -> &Addr {
        match self {
            Account::Base(base) => &base.address,
            Account::Lockup(lockup) => lockup.address(),
        }
    }

    pub fn as_lockup(&self) -> Option<&LockupAccount> {
        match self {
            Account::Lockup(lockup) => Some(lockup),
            Account::Base(_) => None,
        }
    }

    /// Upgrades a base account, keeping address, key and sequence.
    pub fn into_lockup(self) -> LockupAccount {
        match self {
            Account::Base(base) => LockupAccount::new(base),
            Account::Lockup(lockup) => lockup,
        }
    }
}

pub fn get_account(storage: &dyn Storage, address: &Addr) -> StdResult<Option<Account>> {
    ACCOUNTS.may_load(storage, address)
}

pub fn set_account(storage: &mut dyn Storage, account: &Account) -> StdResult<()> {
    ACCOUNTS.save(storage, account.address(), account)
}

pub fn has_account(storage: &dyn Storage, address: &Addr) -> bool {
    ACCOUNTS.has(storage, address)
}

/// Registers a fresh base account with the next account number.
pub fn new_base_account(storage: &mut dyn Storage, address: &Addr) -> StdResult<BaseAccount> {
    let account_number = NEXT_ACCOUNT_NUMBER.may_load(storage)?.unwrap_or_default();
    NEXT_ACCOUNT_NUMBER.save(storage, &(account_number + 1))?;
    Ok(BaseAccount {
        address: address.clone(),
        pub_key: None,
        account_number,
        sequence: 0,
    })
}

/// Loads `address` as a lockup account, if it is one.
pub fn lockup_account(storage: &dyn Storage, address: &Addr) -> StdResult<Option<LockupAccount>> {
    Ok(get_account(storage, address)?.and_then(|account| match account {
        Account::Lockup(lockup) => Some(lockup),
        Account::Base(_) => None,
    }))
}

/// Loads an existing lockup account or fails with `InvalidAccount`.
pub fn load_lockup_account(
    storage: &dyn Storage,
    address: &Addr,
) -> Result<LockupAccount, ContractError> {
    lockup_account(storage, address)?.ok_or_else(|| ContractError::InvalidAccount {
        address: address.to_string(),
    })
}

/// Loads the account at `address` as a lockup account, creating or
/// upgrading it as needed. Nothing is written until the caller saves it.
pub fn load_or_upgrade(storage: &mut dyn Storage, address: &Addr) -> StdResult<LockupAccount> {
    match get_account(storage, address)? {
        Some(account) => Ok(account.into_lockup()),
        None => Ok(LockupAccount::new(new_base_account(storage, address)?)),
    }
}

pub fn save_lockup_account(storage: &mut dyn Storage, account: &LockupAccount) -> StdResult<()> {
    ACCOUNTS.save(
        storage,
        account.address(),
        &Account::Lockup(account.clone()),
    )
}
