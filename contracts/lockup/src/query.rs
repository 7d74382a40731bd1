use chrono::NaiveDate;
use cosmwasm_std::{coin, to_binary, Binary, Deps, Env, Order, StdError, StdResult, Timestamp};
use cw_storage_plus::Bound;

use crate::account::lockup_account;
use crate::date::{date_from_unlock_time, is_locked, parse_date, unlock_time};
use crate::keepers::StakingKeeper;
use crate::msg::{
    ActiveLock, ActiveLocksResponse, LockCursor, LocksForAddressesResponse, LocksResponse,
    QueryMsg, TotalLockedResponse,
};
use crate::queue::total_locked;
use crate::state::{Config, CONFIG, EXPIRATION_QUEUE};

// settings for pagination
const MAX_LIMIT: u32 = 1000;
const DEFAULT_LIMIT: u32 = 100;

pub fn query(
    deps: Deps,
    env: Env,
    staking: &dyn StakingKeeper,
    msg: QueryMsg,
) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_binary(&query_config(deps)?),
        QueryMsg::TotalLocked {} => to_binary(&query_total_locked(deps, staking)?),
        QueryMsg::ActiveLocks {
            start_after,
            limit,
            unlock_before,
        } => to_binary(&query_active_locks(
            deps,
            env,
            staking,
            start_after,
            limit,
            unlock_before,
        )?),
        QueryMsg::Locks { address } => to_binary(&query_locks(deps, env.block.time, address)?),
        QueryMsg::LocksForAddresses { addresses } => {
            let accounts = addresses
                .into_iter()
                .map(|address| query_locks(deps, env.block.time, address))
                .collect::<StdResult<_>>()?;
            to_binary(&LocksForAddressesResponse { accounts })
        }
    }
}

fn query_config(deps: Deps) -> StdResult<Config> {
    CONFIG.load(deps.storage)
}

fn query_total_locked(deps: Deps, staking: &dyn StakingKeeper) -> StdResult<TotalLockedResponse> {
    let total = total_locked(deps.storage)?;
    Ok(TotalLockedResponse {
        total_locked: coin(total.u128(), staking.bond_denom()?),
    })
}

/// Walks the expiration queue in unlock order, so results come back
/// sorted by (unlock date, address) across all accounts.
fn query_active_locks(
    deps: Deps,
    env: Env,
    staking: &dyn StakingKeeper,
    start_after: Option<LockCursor>,
    limit: Option<u32>,
    unlock_before: Option<String>,
) -> StdResult<ActiveLocksResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let bond_denom = staking.bond_denom()?;
    let now = env.block.time;

    let cursor = match start_after {
        Some(cursor) => Some((
            query_unlock_time(&cursor.unlock_date)?,
            deps.api.addr_validate(&cursor.address)?,
        )),
        None => None,
    };
    let before = match unlock_before {
        Some(date) => Some(query_unlock_time(&date)?),
        None => None,
    };
    let min = cursor
        .as_ref()
        .map(|(time, address)| Bound::exclusive((*time, address)));

    let locks = EXPIRATION_QUEUE
        .range(deps.storage, min, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok(((time, address), amount)) => date_from_unlock_time(time)
                .map(|date| Ok((time, address, date, amount))),
            Err(err) => Some(Err(err)),
        })
        .skip_while(|item| matches!(item, Ok((_, _, date, _)) if !is_locked(now, *date)))
        .take_while(|item| match (item, before) {
            (Ok((time, ..)), Some(before)) => *time < before,
            _ => true,
        })
        .take(limit)
        .map(|item| {
            item.map(|(_, address, unlock_date, amount)| ActiveLock {
                address: address.to_string(),
                unlock_date,
                amount: coin(amount.u128(), bond_denom.as_str()),
            })
        })
        .collect::<StdResult<_>>()?;

    Ok(ActiveLocksResponse { locks })
}

/// Locks of `address` that are still active; empty for plain accounts.
fn query_locks(deps: Deps, now: Timestamp, address: String) -> StdResult<LocksResponse> {
    let addr = deps.api.addr_validate(&address)?;
    let locks = match lockup_account(deps.storage, &addr)? {
        Some(account) => account.schedule().active(now).cloned().collect(),
        None => vec![],
    };
    Ok(LocksResponse {
        address: addr.into(),
        locks,
    })
}

fn query_unlock_time(date: &str) -> StdResult<u64> {
    let date: NaiveDate = parse_date(date).map_err(|err| StdError::generic_err(err.to_string()))?;
    unlock_time(date).map_err(|err| StdError::generic_err(err.to_string()))
}
