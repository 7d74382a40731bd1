//! Entries are keyed by `(unlock unix seconds, account)`; the u64 is stored
//! big-endian so ranges come back in unlock order.

use cosmwasm_std::{Addr, Order, StdError, StdResult, Storage, Timestamp, Uint128};
use cw_storage_plus::PrefixBound;
use tracing::warn;

use crate::error::ContractError;
use crate::state::{EXPIRATION_QUEUE, TOTAL_LOCKED};

pub(crate) fn add_to_queue(
    storage: &mut dyn Storage,
    unlock_time: u64,
    address: &Addr,
    amount: Uint128,
) -> StdResult<()> {
    EXPIRATION_QUEUE.update(storage, (unlock_time, address), |current| {
        current.unwrap_or_default().checked_add(amount).map_err(StdError::from)
    })?;
    Ok(())
}

/// Subtracts `amount` from an entry. A missing entry or an amount larger
/// than the entry means the queue no longer mirrors the account's locks.
pub(crate) fn remove_from_queue(
    storage: &mut dyn Storage,
    unlock_time: u64,
    address: &Addr,
    amount: Uint128,
) -> Result<(), ContractError> {
    let key = (unlock_time, address);
    let desync = || {
        warn!(%address, unlock_time, %amount, "expiration queue out of sync");
        ContractError::QueueDesync {
            address: address.to_string(),
            unlock_time,
        }
    };

    let current = EXPIRATION_QUEUE.may_load(storage, key)?.ok_or_else(desync)?;
    let remaining = current.checked_sub(amount).map_err(|_| desync())?;
    if remaining.is_zero() {
        EXPIRATION_QUEUE.remove(storage, key);
    } else {
        EXPIRATION_QUEUE.save(storage, key, &remaining)?;
    }
    Ok(())
}

/// Removes an entry if it is still queued and returns its amount.
pub(crate) fn take_from_queue(
    storage: &mut dyn Storage,
    unlock_time: u64,
    address: &Addr,
) -> StdResult<Option<Uint128>> {
    let key = (unlock_time, address);
    let amount = EXPIRATION_QUEUE.may_load(storage, key)?;
    if amount.is_some() {
        EXPIRATION_QUEUE.remove(storage, key);
    }
    Ok(amount)
}

/// Visits every entry unlocking at or before `cutoff` in (time, account)
/// order and deletes it. Returns how many entries were removed.
pub fn sweep_expired<F, E>(
    storage: &mut dyn Storage,
    cutoff: Timestamp,
    mut on_expired: F,
) -> Result<usize, E>
where
    F: FnMut(&Addr, u64, Uint128) -> Result<(), E>,
    E: From<StdError>,
{
    let expired: Vec<((u64, Addr), Uint128)> = EXPIRATION_QUEUE
        .prefix_range(
            storage,
            None,
            Some(PrefixBound::inclusive(cutoff.seconds())),
            Order::Ascending,
        )
        .collect::<StdResult<_>>()?;

    for ((unlock_time, address), amount) in &expired {
        on_expired(address, *unlock_time, *amount)?;
        EXPIRATION_QUEUE.remove(storage, (*unlock_time, address));
    }
    Ok(expired.len())
}

pub fn total_locked(storage: &dyn Storage) -> StdResult<Uint128> {
    Ok(TOTAL_LOCKED.may_load(storage)?.unwrap_or_default())
}

pub(crate) fn set_total_locked(storage: &mut dyn Storage, amount: Uint128) -> StdResult<()> {
    TOTAL_LOCKED.save(storage, &amount)
}

pub(crate) fn increase_total_locked(storage: &mut dyn Storage, amount: Uint128) -> StdResult<()> {
    let total = total_locked(storage)?.checked_add(amount)?;
    set_total_locked(storage, total)
}

pub(crate) fn decrease_total_locked(storage: &mut dyn Storage, amount: Uint128) -> StdResult<()> {
    let total = total_locked(storage)?.checked_sub(amount)?;
    set_total_locked(storage, total)
}

/// All queue entries in key order. Reconciliation only.
pub fn queue_entries(storage: &dyn Storage) -> StdResult<Vec<(u64, Addr, Uint128)>> {
    EXPIRATION_QUEUE
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|((unlock_time, address), amount)| (unlock_time, address, amount)))
        .collect()
}

/// Brute-force sum of the queue, to reconcile against `TOTAL_LOCKED`.
pub fn queued_total(storage: &dyn Storage) -> StdResult<Uint128> {
    queue_entries(storage)?
        .into_iter()
        .try_fold(Uint128::zero(), |acc, (_, _, amount)| {
            acc.checked_add(amount).map_err(StdError::from)
        })
}
