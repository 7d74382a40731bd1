use cosmwasm_std::{DepsMut, Env, Event, Response, StdError};
use tracing::debug;

use crate::date::date_from_unlock_time;
use crate::error::ContractError;
use crate::queue::{set_total_locked, sweep_expired, total_locked};

/// End-of-block sweep: removes every queue entry whose unlock time has
/// been reached and takes its amount off the total.
///
/// Account schedules are left as they are; expired locks there no longer
/// count as locked and are dropped by the post-transaction hook.
pub fn end_block(deps: DepsMut, env: &Env) -> Result<Response, ContractError> {
    let mut total = total_locked(deps.storage)?;
    let mut events = vec![];

    let swept = sweep_expired(deps.storage, env.block.time, |address, unlock_time, amount| {
        total = total.checked_sub(amount).map_err(StdError::from)?;
        let unlock_date = date_from_unlock_time(unlock_time)
            .map(|date| date.to_string())
            .unwrap_or_else(|| unlock_time.to_string());
        events.push(
            Event::new("expire_lock")
                .add_attribute("address", address)
                .add_attribute("unlock_date", unlock_date)
                .add_attribute("amount", amount),
        );
        Ok::<(), ContractError>(())
    })?;

    if swept > 0 {
        set_total_locked(deps.storage, total)?;
        debug!(height = env.block.height, swept, %total, "expired locks swept");
    }

    Ok(Response::new()
        .add_attribute("action", "end_block")
        .add_attribute("swept", swept.to_string())
        .add_events(events))
}
