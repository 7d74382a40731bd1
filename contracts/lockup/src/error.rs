use chrono::NaiveDate;
use cosmwasm_std::{StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid date format: {date}")]
    InvalidDate { date: String },

    #[error("unlock date must be at least {months} months from now (earliest {earliest})")]
    UnlockTooSoon { months: u32, earliest: NaiveDate },

    #[error("unlock date cannot be more than {months} months from now (latest {latest})")]
    UnlockTooLate { months: u32, latest: NaiveDate },

    #[error("unlock date {to} must be after from date {from}")]
    InvalidExtension { from: NaiveDate, to: NaiveDate },

    #[error("lock for unlock date {date} has already expired")]
    LockExpired { date: NaiveDate },

    #[error("extension amount mismatch for unlock date {date}: you must extend the entire amount {expected}, got {requested}")]
    ExtensionAmountMismatch {
        date: NaiveDate,
        expected: Uint128,
        requested: Uint128,
    },

    #[error("total amount {total} does not match sum of outputs {outputs}")]
    TotalMismatch { total: Uint128, outputs: Uint128 },

    #[error("Request has no entries")]
    EmptyRequest {},

    #[error("Request exceeds {max} entries")]
    TooManyEntries { max: u32 },

    #[error("validator not found: {address}")]
    ValidatorNotFound { address: String },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid lock amount: {amount}")]
    InvalidAmount { amount: String },

    #[error("invalid denom: {denom}, expected: {expected}")]
    InvalidDenom { denom: String, expected: String },

    #[error("insufficient unlocked balance: available {available}, required {required}")]
    InsufficientUnlockedBalance {
        available: Uint128,
        required: Uint128,
    },

    #[error("trying to lock more than total delegations: total delegations {delegated} < locked amount {locked}")]
    LockExceedsDelegations { delegated: Uint128, locked: Uint128 },

    #[error("unbond would cause new delegated amount to be less than the locked amount: {delegated} - {amount} < {locked}")]
    UndelegateBelowLocked {
        delegated: Uint128,
        amount: Uint128,
        locked: Uint128,
    },

    #[error("no lockup found for unlock date: {date}")]
    LockupNotFound { date: NaiveDate },

    #[error("account is not a lockup account: {address}")]
    InvalidAccount { address: String },

    #[error("expiration queue out of sync for {address} at {unlock_time}")]
    QueueDesync { address: String, unlock_time: u64 },
}

/// Coarse error classes surfaced to clients alongside the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddress,
    InvalidRequest,
    InvalidCoins,
    InsufficientUnlockedBalance,
    InsufficientDelegations,
    LockupNotFound,
    InvalidAccount,
    Unauthorized,
    Internal,
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Std(_) | ContractError::QueueDesync { .. } => ErrorKind::Internal,
            ContractError::Unauthorized {} => ErrorKind::Unauthorized,
            ContractError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            ContractError::InvalidDate { .. }
            | ContractError::UnlockTooSoon { .. }
            | ContractError::UnlockTooLate { .. }
            | ContractError::InvalidExtension { .. }
            | ContractError::LockExpired { .. }
            | ContractError::ExtensionAmountMismatch { .. }
            | ContractError::TotalMismatch { .. }
            | ContractError::EmptyRequest {}
            | ContractError::TooManyEntries { .. }
            | ContractError::ValidatorNotFound { .. }
            | ContractError::InvalidConfig { .. } => ErrorKind::InvalidRequest,
            ContractError::InvalidAmount { .. } | ContractError::InvalidDenom { .. } => {
                ErrorKind::InvalidCoins
            }
            ContractError::InsufficientUnlockedBalance { .. } => {
                ErrorKind::InsufficientUnlockedBalance
            }
            ContractError::LockExceedsDelegations { .. }
            | ContractError::UndelegateBelowLocked { .. } => ErrorKind::InsufficientDelegations,
            ContractError::LockupNotFound { .. } => ErrorKind::LockupNotFound,
            ContractError::InvalidAccount { .. } => ErrorKind::InvalidAccount,
        }
    }
}
