use chrono::{Datelike, Months, NaiveDate};
use cosmwasm_std::Timestamp;

use crate::error::ContractError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const SECONDS_PER_DAY: u64 = 86_400;

// 1970-01-01 counted from 0001-01-01 (day 1).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate, ContractError> {
    if date.len() != 10 {
        return Err(ContractError::InvalidDate {
            date: date.to_string(),
        });
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| ContractError::InvalidDate {
        date: date.to_string(),
    })
}

/// Days since the unix epoch, negative before 1970.
pub fn epoch_day(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - i64::from(UNIX_EPOCH_DAYS_FROM_CE)
}

/// Block time truncated to whole days since the unix epoch.
pub fn block_day(now: Timestamp) -> i64 {
    i64::try_from(now.seconds() / SECONDS_PER_DAY).unwrap_or(i64::MAX)
}

/// Calendar day of the block time (UTC).
pub fn block_date(now: Timestamp) -> NaiveDate {
    block_day(now)
        .checked_add(i64::from(UNIX_EPOCH_DAYS_FROM_CE))
        .and_then(|days| i32::try_from(days).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(NaiveDate::MAX)
}

/// `true` while `unlock_date` is still in the future relative to the
/// current ledger day. The clock is truncated to midnight UTC.
pub fn is_locked(now: Timestamp, unlock_date: NaiveDate) -> bool {
    block_day(now) < epoch_day(unlock_date)
}

/// Unix seconds of midnight UTC on `date`; this is the expiration queue key.
pub fn unlock_time(date: NaiveDate) -> Result<u64, ContractError> {
    epoch_day(date)
        .checked_mul(SECONDS_PER_DAY as i64)
        .and_then(|secs| u64::try_from(secs).ok())
        .ok_or_else(|| ContractError::InvalidDate {
            date: date.to_string(),
        })
}

/// Inverse of [`unlock_time`].
pub fn date_from_unlock_time(seconds: u64) -> Option<NaiveDate> {
    let days = i64::try_from(seconds / SECONDS_PER_DAY).ok()?;
    let days = i32::try_from(days.checked_add(i64::from(UNIX_EPOCH_DAYS_FROM_CE))?).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

/// `today + months`, clamped to the last valid date on overflow.
pub fn months_from(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Rejects unlock dates outside `[today + min_months, today + max_months]`.
pub fn check_unlock_window(
    now: Timestamp,
    unlock_date: NaiveDate,
    min_months: u32,
    max_months: u32,
) -> Result<(), ContractError> {
    let today = block_date(now);
    let earliest = months_from(today, min_months);
    if unlock_date < earliest {
        return Err(ContractError::UnlockTooSoon {
            months: min_months,
            earliest,
        });
    }
    check_max_horizon(now, unlock_date, max_months)
}

/// Rejects unlock dates after `today + max_months`.
pub fn check_max_horizon(
    now: Timestamp,
    unlock_date: NaiveDate,
    max_months: u32,
) -> Result<(), ContractError> {
    let latest = months_from(block_date(now), max_months);
    if unlock_date > latest {
        return Err(ContractError::UnlockTooLate {
            months: max_months,
            latest,
        });
    }
    Ok(())
}
