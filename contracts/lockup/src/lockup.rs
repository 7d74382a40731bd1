//! Callers save the account after these; each one keeps the schedule, the
//! queue and the aggregate in step.

use chrono::NaiveDate;
use cosmwasm_std::{StdResult, Storage, Timestamp, Uint128};
use tracing::debug;

use crate::account::LockupAccount;
use crate::date::unlock_time;
use crate::error::ContractError;
use crate::queue::{
    add_to_queue, decrease_total_locked, increase_total_locked, remove_from_queue,
    take_from_queue,
};
use crate::schedule::{Lock, LockSchedule};

/// Adds `amount` to the lock unlocking on `unlock_date`.
pub fn add_lock(
    storage: &mut dyn Storage,
    account: &mut LockupAccount,
    unlock_date: NaiveDate,
    amount: Uint128,
) -> Result<(), ContractError> {
    let time = unlock_time(unlock_date)?;
    account.schedule_mut().upsert(unlock_date, amount)?;
    add_to_queue(storage, time, account.address(), amount)?;
    increase_total_locked(storage, amount)?;
    debug!(address = %account.address(), %unlock_date, %amount, "lock added");
    Ok(())
}

/// Moves the whole lock on `from` to `to` within `schedule` only.
pub(crate) fn shift_whole_lock(
    schedule: &mut LockSchedule,
    from: NaiveDate,
    to: NaiveDate,
    amount: Uint128,
) -> Result<(), ContractError> {
    let (idx, lock) = schedule
        .find(from)
        .ok_or(ContractError::LockupNotFound { date: from })?;
    if lock.amount != amount {
        return Err(ContractError::ExtensionAmountMismatch {
            date: from,
            expected: lock.amount,
            requested: amount,
        });
    }
    schedule.remove(idx);
    schedule.upsert(to, amount)?;
    Ok(())
}

/// Moves the whole lock on `from` to `to`. The aggregate is untouched.
pub fn move_lock(
    storage: &mut dyn Storage,
    account: &mut LockupAccount,
    from: NaiveDate,
    to: NaiveDate,
    amount: Uint128,
) -> Result<(), ContractError> {
    let from_time = unlock_time(from)?;
    let to_time = unlock_time(to)?;
    shift_whole_lock(account.schedule_mut(), from, to, amount)?;

    remove_from_queue(storage, from_time, account.address(), amount)?;
    add_to_queue(storage, to_time, account.address(), amount)?;
    debug!(address = %account.address(), %from, %to, %amount, "lock moved");
    Ok(())
}

/// Drops every lock of `account` that is no longer locked at `now` and
/// removes whatever of it the end-block sweep has not already removed.
pub fn expire_locks(
    storage: &mut dyn Storage,
    account: &mut LockupAccount,
    now: Timestamp,
) -> StdResult<Vec<Lock>> {
    let expired = account.schedule_mut().drain_expired(now);
    for lock in &expired {
        // pre-1970 dates never reach a schedule
        let time = match unlock_time(lock.unlock_date) {
            Ok(time) => time,
            Err(_) => continue,
        };
        if let Some(queued) = take_from_queue(storage, time, account.address())? {
            decrease_total_locked(storage, queued)?;
        }
    }
    if !expired.is_empty() {
        debug!(address = %account.address(), count = expired.len(), "locks expired");
    }
    Ok(expired)
}
