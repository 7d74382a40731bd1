use chrono::NaiveDate;
use cosmwasm_std::{
    coin, Addr, Coin, Deps, DepsMut, Env, Event, MessageInfo, Response, StdError, Storage,
    Timestamp, Uint128,
};
use cw2::set_contract_version;

use crate::abci::end_block;
use crate::account::{load_lockup_account, load_or_upgrade, save_lockup_account};
use crate::ante::ante_handle;
use crate::date::{check_max_horizon, check_unlock_window, is_locked, parse_date};
use crate::error::ContractError;
use crate::keepers::{total_delegated, BankKeeper, StakingKeeper};
use crate::lockup::{add_lock, move_lock, shift_whole_lock};
use crate::msg::{
    ExecuteMsg, Extension, InstantiateMsg, LockEntry, SendDelegateAndLockOutput, SudoMsg,
};
use crate::post::post_handle;
use crate::state::{
    Config, CONFIG, DEFAULT_MAX_ENTRIES_PER_MSG, DEFAULT_MAX_LOCK_MONTHS, DEFAULT_MIN_LOCK_MONTHS,
};

// version info for migration info
const CONTRACT_NAME: &str = "crates.io:cw-disper-lockup";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let authority = match msg.authority {
        Some(authority) => validate_address(deps.as_ref(), &authority)?,
        None => info.sender,
    };
    let config = Config {
        authority,
        min_lock_months: msg.min_lock_months.unwrap_or(DEFAULT_MIN_LOCK_MONTHS),
        max_lock_months: msg.max_lock_months.unwrap_or(DEFAULT_MAX_LOCK_MONTHS),
        max_entries_per_msg: msg
            .max_entries_per_msg
            .unwrap_or(DEFAULT_MAX_ENTRIES_PER_MSG),
    };
    validate_config(&config)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("authority", config.authority))
}

pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    bank: &mut dyn BankKeeper,
    staking: &mut dyn StakingKeeper,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Lock { locks } => try_lock(deps, env, staking, &info.sender, locks),
        ExecuteMsg::Extend { extensions } => {
            try_extend(deps, env, staking, &info.sender, extensions)
        }
        ExecuteMsg::SendDelegateAndLock {
            to_address,
            validator_address,
            amount,
            unlock_date,
        } => {
            let output = SendDelegateAndLockOutput {
                to_address,
                validator_address,
                amount,
                unlock_date,
            };
            try_send_delegate_and_lock(deps, env, bank, staking, &info.sender, output)
        }
        ExecuteMsg::MultiSendDelegateAndLock {
            total_amount,
            outputs,
        } => try_multi_send_delegate_and_lock(
            deps,
            env,
            bank,
            staking,
            &info.sender,
            total_amount,
            outputs,
        ),
        ExecuteMsg::UpdateConfig {
            authority,
            min_lock_months,
            max_lock_months,
            max_entries_per_msg,
        } => try_update_config(
            deps,
            info,
            authority,
            min_lock_months,
            max_lock_months,
            max_entries_per_msg,
        ),
    }
}

/// Privileged entry point used by the host ledger.
pub fn sudo(
    deps: DepsMut,
    env: Env,
    bank: &dyn BankKeeper,
    staking: &dyn StakingKeeper,
    msg: SudoMsg,
) -> Result<Response, ContractError> {
    match msg {
        SudoMsg::AnteHandle { tx } => {
            ante_handle(deps.as_ref(), &env, bank, staking, &tx)?;
            Ok(Response::new().add_attribute("action", "ante_handle"))
        }
        SudoMsg::PostHandle {
            tx,
            simulate,
            success,
        } => post_handle(deps, &env, &tx, simulate, success),
        SudoMsg::EndBlock {} => end_block(deps, &env),
    }
}

pub fn try_lock(
    deps: DepsMut,
    env: Env,
    staking: &dyn StakingKeeper,
    sender: &Addr,
    locks: Vec<LockEntry>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    check_entry_count(locks.len(), &config)?;
    let bond_denom = staking.bond_denom()?;
    let now = env.block.time;

    let mut entries = Vec::with_capacity(locks.len());
    for lock in &locks {
        check_bond_coin(&lock.amount, &bond_denom)?;
        let unlock_date = parse_date(&lock.unlock_date)?;
        check_unlock_window(
            now,
            unlock_date,
            config.min_lock_months,
            config.max_lock_months,
        )?;
        entries.push((unlock_date, lock.amount.amount));
    }

    lock_delegated(deps.storage, staking, now, sender, &entries)?;

    let mut res = Response::new()
        .add_attribute("action", "lock")
        .add_attribute("from", sender);
    for ((unlock_date, _), lock) in entries.iter().zip(&locks) {
        res = res.add_event(lock_event(sender, *unlock_date, &lock.amount));
    }
    Ok(res)
}

pub fn try_extend(
    deps: DepsMut,
    env: Env,
    staking: &dyn StakingKeeper,
    sender: &Addr,
    extensions: Vec<Extension>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    check_entry_count(extensions.len(), &config)?;
    let bond_denom = staking.bond_denom()?;
    let now = env.block.time;

    let mut moves = Vec::with_capacity(extensions.len());
    for extension in &extensions {
        check_bond_coin(&extension.amount, &bond_denom)?;
        let from = parse_date(&extension.from_date)?;
        let to = parse_date(&extension.to_date)?;
        if to <= from {
            return Err(ContractError::InvalidExtension { from, to });
        }
        if !is_locked(now, from) {
            return Err(ContractError::LockExpired { date: from });
        }
        check_max_horizon(now, to, config.max_lock_months)?;
        moves.push((from, to, extension.amount.amount));
    }

    let mut account = load_lockup_account(deps.storage, sender)?;

    // all or nothing: replay every move on a copy first
    let mut scratch = account.schedule().clone();
    for (from, to, amount) in &moves {
        shift_whole_lock(&mut scratch, *from, *to, *amount)?;
    }

    let mut res = Response::new()
        .add_attribute("action", "extend")
        .add_attribute("from", sender);
    for (from, to, amount) in moves {
        move_lock(deps.storage, &mut account, from, to, amount)?;
        res = res.add_event(
            Event::new("extend_lock")
                .add_attribute("address", sender)
                .add_attribute("old_unlock_date", from.to_string())
                .add_attribute("unlock_date", to.to_string())
                .add_attribute("amount", coin(amount.u128(), &bond_denom).to_string()),
        );
    }
    save_lockup_account(deps.storage, &account)?;

    Ok(res)
}

pub fn try_send_delegate_and_lock(
    deps: DepsMut,
    env: Env,
    bank: &mut dyn BankKeeper,
    staking: &mut dyn StakingKeeper,
    sender: &Addr,
    output: SendDelegateAndLockOutput,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let bond_denom = staking.bond_denom()?;
    let validated = validate_output(deps.as_ref(), &config, &*staking, env.block.time, &output)?;

    let events = send_delegate_and_lock(
        deps.storage,
        bank,
        staking,
        env.block.time,
        sender,
        &bond_denom,
        &validated,
    )?;

    Ok(Response::new()
        .add_attribute("action", "send_delegate_and_lock")
        .add_attribute("from", sender)
        .add_events(events))
}

pub fn try_multi_send_delegate_and_lock(
    deps: DepsMut,
    env: Env,
    bank: &mut dyn BankKeeper,
    staking: &mut dyn StakingKeeper,
    sender: &Addr,
    total_amount: Uint128,
    outputs: Vec<SendDelegateAndLockOutput>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    check_entry_count(outputs.len(), &config)?;

    let sum = outputs
        .iter()
        .try_fold(Uint128::zero(), |acc, output| acc.checked_add(output.amount))
        .map_err(StdError::from)?;
    if sum != total_amount {
        return Err(ContractError::TotalMismatch {
            total: total_amount,
            outputs: sum,
        });
    }

    let validated = outputs
        .iter()
        .map(|output| validate_output(deps.as_ref(), &config, &*staking, env.block.time, output))
        .collect::<Result<Vec<_>, _>>()?;

    let bond_denom = staking.bond_denom()?;
    let mut res = Response::new()
        .add_attribute("action", "multi_send_delegate_and_lock")
        .add_attribute("from", sender)
        .add_attribute("outputs", validated.len().to_string());
    for output in &validated {
        let events = send_delegate_and_lock(
            deps.storage,
            bank,
            staking,
            env.block.time,
            sender,
            &bond_denom,
            output,
        )?;
        res = res.add_events(events);
    }
    Ok(res)
}

pub fn try_update_config(
    deps: DepsMut,
    info: MessageInfo,
    authority: Option<String>,
    min_lock_months: Option<u32>,
    max_lock_months: Option<u32>,
    max_entries_per_msg: Option<u32>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.authority {
        return Err(ContractError::Unauthorized {});
    }

    if let Some(authority) = authority {
        config.authority = validate_address(deps.as_ref(), &authority)?;
    }
    if let Some(months) = min_lock_months {
        config.min_lock_months = months;
    }
    if let Some(months) = max_lock_months {
        config.max_lock_months = months;
    }
    if let Some(max) = max_entries_per_msg {
        config.max_entries_per_msg = max;
    }
    validate_config(&config)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_config")
        .add_attribute("authority", config.authority))
}

/// An output whose every field has been checked.
struct ValidatedOutput {
    to: Addr,
    validator: String,
    amount: Uint128,
    unlock_date: NaiveDate,
}

fn validate_output(
    deps: Deps,
    config: &Config,
    staking: &dyn StakingKeeper,
    now: Timestamp,
    output: &SendDelegateAndLockOutput,
) -> Result<ValidatedOutput, ContractError> {
    let to = validate_address(deps, &output.to_address)?;
    if output.amount.is_zero() {
        return Err(ContractError::InvalidAmount {
            amount: output.amount.to_string(),
        });
    }
    if staking.validator(&output.validator_address)?.is_none() {
        return Err(ContractError::ValidatorNotFound {
            address: output.validator_address.clone(),
        });
    }
    let unlock_date = parse_date(&output.unlock_date)?;
    check_unlock_window(
        now,
        unlock_date,
        config.min_lock_months,
        config.max_lock_months,
    )?;

    Ok(ValidatedOutput {
        to,
        validator: output.validator_address.clone(),
        amount: output.amount,
        unlock_date,
    })
}

fn send_delegate_and_lock(
    storage: &mut dyn Storage,
    bank: &mut dyn BankKeeper,
    staking: &mut dyn StakingKeeper,
    now: Timestamp,
    sender: &Addr,
    bond_denom: &str,
    output: &ValidatedOutput,
) -> Result<Vec<Event>, ContractError> {
    let funds = coin(output.amount.u128(), bond_denom);
    bank.send_coins(sender, &output.to, &[funds.clone()])?;
    let shares = staking.delegate(&output.to, &output.validator, output.amount)?;

    lock_delegated(
        storage,
        &*staking,
        now,
        &output.to,
        &[(output.unlock_date, output.amount)],
    )?;

    Ok(vec![
        Event::new("delegate")
            .add_attribute("validator", &output.validator)
            .add_attribute("delegator", &output.to)
            .add_attribute("amount", funds.to_string())
            .add_attribute("new_shares", shares.to_string()),
        lock_event(&output.to, output.unlock_date, &funds),
    ])
}

/// Adds every `(unlock_date, amount)` lock to `address`. The active locked
/// amount plus the whole batch must be covered by delegations.
fn lock_delegated(
    storage: &mut dyn Storage,
    staking: &dyn StakingKeeper,
    now: Timestamp,
    address: &Addr,
    locks: &[(NaiveDate, Uint128)],
) -> Result<(), ContractError> {
    let mut account = load_or_upgrade(storage, address)?;
    let locked = locks
        .iter()
        .try_fold(account.schedule().locked_amount(now), |acc, (_, amount)| {
            acc.checked_add(*amount)
        })
        .map_err(StdError::from)?;
    let delegated = total_delegated(staking, address)?;
    if delegated < locked {
        return Err(ContractError::LockExceedsDelegations { delegated, locked });
    }

    for (unlock_date, amount) in locks {
        add_lock(storage, &mut account, *unlock_date, *amount)?;
    }
    save_lockup_account(storage, &account)?;
    Ok(())
}

fn lock_event(address: &Addr, unlock_date: NaiveDate, amount: &Coin) -> Event {
    Event::new("lock")
        .add_attribute("address", address)
        .add_attribute("unlock_date", unlock_date.to_string())
        .add_attribute("amount", amount.to_string())
}

fn check_bond_coin(amount: &Coin, bond_denom: &str) -> Result<(), ContractError> {
    if amount.amount.is_zero() {
        return Err(ContractError::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    if amount.denom != bond_denom {
        return Err(ContractError::InvalidDenom {
            denom: amount.denom.clone(),
            expected: bond_denom.to_string(),
        });
    }
    Ok(())
}

fn check_entry_count(count: usize, config: &Config) -> Result<(), ContractError> {
    if count == 0 {
        return Err(ContractError::EmptyRequest {});
    }
    if count > config.max_entries_per_msg as usize {
        return Err(ContractError::TooManyEntries {
            max: config.max_entries_per_msg,
        });
    }
    Ok(())
}

fn validate_address(deps: Deps, address: &str) -> Result<Addr, ContractError> {
    deps.api
        .addr_validate(address)
        .map_err(|err| ContractError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}

fn validate_config(config: &Config) -> Result<(), ContractError> {
    let reason = if config.max_lock_months == 0 {
        "max_lock_months must be positive"
    } else if config.min_lock_months > config.max_lock_months {
        "min_lock_months exceeds max_lock_months"
    } else if config.max_entries_per_msg == 0 {
        "max_entries_per_msg must be positive"
    } else {
        return Ok(());
    };
    Err(ContractError::InvalidConfig {
        reason: reason.to_string(),
    })
}
