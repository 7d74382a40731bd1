use cosmwasm_std::{DepsMut, Env, Event, Response};

use crate::account::{lockup_account, save_lockup_account};
use crate::error::ContractError;
use crate::lockup::expire_locks;
use crate::tx::Tx;

/// Runs after a transaction. Drops the fee payer's expired locks so its
/// stored schedule does not wait for the end-block sweep.
pub fn post_handle(
    deps: DepsMut,
    env: &Env,
    tx: &Tx,
    simulate: bool,
    success: bool,
) -> Result<Response, ContractError> {
    let res = Response::new().add_attribute("action", "post_handle");
    if simulate || !success {
        return Ok(res);
    }
    let fee_payer = match tx.fee_payer() {
        Some(fee_payer) => fee_payer,
        None => return Ok(res),
    };
    let address = match deps.api.addr_validate(fee_payer) {
        Ok(address) => address,
        Err(_) => return Ok(res),
    };
    let mut account = match lockup_account(deps.storage, &address)? {
        Some(account) => account,
        None => return Ok(res),
    };

    let expired = expire_locks(deps.storage, &mut account, env.block.time)?;
    if expired.is_empty() {
        return Ok(res);
    }
    save_lockup_account(deps.storage, &account)?;

    let events = expired.iter().map(|lock| {
        Event::new("expire_lock")
            .add_attribute("address", &address)
            .add_attribute("unlock_date", lock.unlock_date.to_string())
            .add_attribute("amount", lock.amount)
    });
    Ok(res.add_events(events))
}
