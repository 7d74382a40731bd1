use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::{StdResult, Timestamp, Uint128};

use crate::date::is_locked;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct Lock {
    pub unlock_date: NaiveDate,
    pub amount: Uint128,
}

/// Locks of one account, strictly increasing by unlock date.
///
/// Same-date locks are merged, so a date appears at most once and every
/// stored amount is non-zero. Mutation is crate-internal: changes must go
/// through [`crate::lockup`] so the expiration queue stays in step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default, JsonSchema)]
pub struct LockSchedule {
    locks: Vec<Lock>,
}

impl LockSchedule {
    pub fn locks(&self) -> &[Lock] {
        &self.locks
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    fn search(&self, unlock_date: NaiveDate) -> Result<usize, usize> {
        self.locks
            .binary_search_by(|lock| lock.unlock_date.cmp(&unlock_date))
    }

    pub fn find(&self, unlock_date: NaiveDate) -> Option<(usize, &Lock)> {
        self.search(unlock_date)
            .ok()
            .map(|idx| (idx, &self.locks[idx]))
    }

    /// Sum of all locks still locked at `now`.
    pub fn locked_amount(&self, now: Timestamp) -> Uint128 {
        self.active(now).map(|lock| lock.amount).sum()
    }

    pub fn active(&self, now: Timestamp) -> impl Iterator<Item = &Lock> {
        self.locks
            .iter()
            .filter(move |lock| is_locked(now, lock.unlock_date))
    }

    pub(crate) fn upsert(&mut self, unlock_date: NaiveDate, amount: Uint128) -> StdResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        match self.search(unlock_date) {
            Ok(idx) => {
                let lock = &mut self.locks[idx];
                lock.amount = lock.amount.checked_add(amount)?;
            }
            Err(idx) => self.locks.insert(
                idx,
                Lock {
                    unlock_date,
                    amount,
                },
            ),
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, idx: usize) -> Lock {
        self.locks.remove(idx)
    }

    /// Removes and returns every lock that is no longer locked at `now`.
    pub(crate) fn drain_expired(&mut self, now: Timestamp) -> Vec<Lock> {
        // sorted, so expired locks form a prefix
        let split = self
            .locks
            .iter()
            .position(|lock| is_locked(now, lock.unlock_date))
            .unwrap_or(self.locks.len());
        self.locks.drain(..split).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{parse_date, unlock_time};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn dates(schedule: &LockSchedule) -> Vec<String> {
        schedule
            .locks()
            .iter()
            .map(|l| l.unlock_date.to_string())
            .collect()
    }

    #[test]
    fn upsert_keeps_order_and_merges() {
        let mut schedule = LockSchedule::default();
        schedule.upsert(date("2027-06-01"), Uint128::new(10)).unwrap();
        schedule.upsert(date("2027-01-01"), Uint128::new(20)).unwrap();
        schedule.upsert(date("2028-01-01"), Uint128::new(30)).unwrap();
        schedule.upsert(date("2027-06-01"), Uint128::new(5)).unwrap();
        schedule.upsert(date("2027-03-01"), Uint128::zero()).unwrap();

        assert_eq!(
            vec!["2027-01-01", "2027-06-01", "2028-01-01"],
            dates(&schedule)
        );
        let (idx, lock) = schedule.find(date("2027-06-01")).unwrap();
        assert_eq!(1, idx);
        assert_eq!(Uint128::new(15), lock.amount);
        assert!(schedule.find(date("2027-03-01")).is_none());
    }

    #[test]
    fn remove_preserves_remainder() {
        let mut schedule = LockSchedule::default();
        for (d, a) in [("2027-01-01", 1), ("2027-02-01", 2), ("2027-03-01", 3)] {
            schedule.upsert(date(d), Uint128::new(a)).unwrap();
        }
        let removed = schedule.remove(1);
        assert_eq!(Uint128::new(2), removed.amount);
        assert_eq!(vec!["2027-01-01", "2027-03-01"], dates(&schedule));
    }

    #[test]
    fn locked_amount_uses_day_floor() {
        let mut schedule = LockSchedule::default();
        schedule.upsert(date("2027-01-01"), Uint128::new(100)).unwrap();
        schedule.upsert(date("2027-01-02"), Uint128::new(50)).unwrap();

        let noon = |d: &str| Timestamp::from_seconds(unlock_time(date(d)).unwrap() + 43_200);
        assert_eq!(Uint128::new(150), schedule.locked_amount(noon("2026-12-31")));
        assert_eq!(Uint128::new(50), schedule.locked_amount(noon("2027-01-01")));
        assert_eq!(Uint128::zero(), schedule.locked_amount(noon("2027-01-02")));
    }

    #[test]
    fn drain_expired_takes_prefix() {
        let mut schedule = LockSchedule::default();
        for (d, a) in [("2027-01-01", 1), ("2027-02-01", 2), ("2027-03-01", 3)] {
            schedule.upsert(date(d), Uint128::new(a)).unwrap();
        }
        let now = Timestamp::from_seconds(unlock_time(date("2027-02-01")).unwrap());
        let expired = schedule.drain_expired(now);
        assert_eq!(2, expired.len());
        assert_eq!(vec!["2027-03-01"], dates(&schedule));
        assert!(schedule.drain_expired(now).is_empty());
    }
}
