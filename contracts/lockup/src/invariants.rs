#![cfg(test)]

use chrono::NaiveDate;
use cosmwasm_std::testing::{mock_dependencies, mock_info, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{coin, coins, Addr, OwnedDeps, Timestamp, Uint128};
use proptest::prelude::*;

use crate::abci::end_block;
use crate::account::{lockup_account, load_or_upgrade, save_lockup_account};
use crate::backing::BackingValidator;
use crate::contract::{execute, instantiate};
use crate::date::{block_date, months_from, unlock_time, SECONDS_PER_DAY};
use crate::error::ContractError;
use crate::keepers::StakingKeeper;
use crate::mock::{noon, MockBank, MockStaking, BOND_DENOM, VALIDATOR};
use crate::msg::{ExecuteMsg, Extension, InstantiateMsg, LockEntry};
use crate::post::post_handle;
use crate::queue::{queue_entries, queued_total, total_locked};
use crate::tx::{Tx, TxMsg};

const ACCOUNTS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Clone, Debug)]
enum Op {
    Lock { who: usize, months: u32, amount: u128 },
    Extend { who: usize, pick: usize, days: u64 },
    Advance { days: u64 },
    EndBlock,
    PostHandle { who: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 6..=24u32, 1..1_000u128)
            .prop_map(|(who, months, amount)| Op::Lock { who, months, amount }),
        (0..3usize, 0..8usize, 1..400u64).prop_map(|(who, pick, days)| Op::Extend {
            who,
            pick,
            days
        }),
        (1..120u64).prop_map(|days| Op::Advance { days }),
        Just(Op::EndBlock),
        (0..3usize).prop_map(|who| Op::PostHandle { who }),
    ]
}

struct Chain {
    deps: OwnedDeps<MockStorage, MockApi, MockQuerier>,
    bank: MockBank,
    staking: MockStaking,
    now: Timestamp,
}

impl Chain {
    fn new() -> Self {
        let mut deps = mock_dependencies();
        let mut staking = MockStaking::new(BOND_DENOM, &[VALIDATOR]);
        for name in ACCOUNTS {
            staking
                .delegate(&Addr::unchecked(name), VALIDATOR, Uint128::new(1_000_000))
                .unwrap();
        }
        let now = noon("2026-01-01");
        let mut env = cosmwasm_std::testing::mock_env();
        env.block.time = now;
        instantiate(
            deps.as_mut(),
            env,
            mock_info("creator", &[]),
            InstantiateMsg::default(),
        )
        .unwrap();
        Chain {
            deps,
            bank: MockBank::default(),
            staking,
            now,
        }
    }

    fn env(&self) -> cosmwasm_std::Env {
        let mut env = cosmwasm_std::testing::mock_env();
        env.block.time = self.now;
        env
    }

    fn execute(&mut self, sender: &str, msg: ExecuteMsg) -> Result<(), ContractError> {
        let env = self.env();
        execute(
            self.deps.as_mut(),
            env,
            mock_info(sender, &[]),
            &mut self.bank,
            &mut self.staking,
            msg,
        )
        .map(|_| ())
    }

    fn active_locks(&self, who: &str) -> Vec<(NaiveDate, Uint128)> {
        lockup_account(self.deps.as_ref().storage, &Addr::unchecked(who))
            .unwrap()
            .map(|account| {
                account
                    .schedule()
                    .active(self.now)
                    .map(|lock| (lock.unlock_date, lock.amount))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn locked(&self, who: &str) -> Uint128 {
        self.active_locks(who).into_iter().map(|(_, amount)| amount).sum()
    }

    fn apply(&mut self, op: &Op) -> Result<(), TestCaseError> {
        match *op {
            Op::Lock { who, months, amount } => {
                let date = months_from(block_date(self.now), months);
                let _ = self.execute(
                    ACCOUNTS[who],
                    ExecuteMsg::Lock {
                        locks: vec![LockEntry {
                            unlock_date: date.to_string(),
                            amount: coin(amount, BOND_DENOM),
                        }],
                    },
                );
            }
            Op::Extend { who, pick, days } => {
                let locks = self.active_locks(ACCOUNTS[who]);
                if locks.is_empty() {
                    return Ok(());
                }
                let (from, amount) = locks[pick % locks.len()];
                let to = from + chrono::Duration::days(days as i64);
                let before = self.locked(ACCOUNTS[who]);
                let res = self.execute(
                    ACCOUNTS[who],
                    ExecuteMsg::Extend {
                        extensions: vec![Extension {
                            from_date: from.to_string(),
                            to_date: to.to_string(),
                            amount: coin(amount.u128(), BOND_DENOM),
                        }],
                    },
                );
                if res.is_ok() {
                    prop_assert!(self
                        .active_locks(ACCOUNTS[who])
                        .iter()
                        .all(|(date, _)| *date != from));
                }
                prop_assert_eq!(before, self.locked(ACCOUNTS[who]));
            }
            Op::Advance { days } => {
                self.now = self.now.plus_seconds(days * SECONDS_PER_DAY);
            }
            Op::EndBlock => {
                let env = self.env();
                end_block(self.deps.as_mut(), &env).unwrap();
            }
            Op::PostHandle { who } => {
                let env = self.env();
                let tx = Tx {
                    msgs: vec![TxMsg::Other {
                        type_url: "/x.y.Msg".into(),
                        signer: ACCOUNTS[who].into(),
                    }],
                    fee_payer: None,
                };
                post_handle(self.deps.as_mut(), &env, &tx, false, true).unwrap();
            }
        }
        Ok(())
    }

    fn check(&self) -> Result<(), TestCaseError> {
        let storage = self.deps.as_ref().storage;
        let entries = queue_entries(storage).unwrap();
        prop_assert_eq!(total_locked(storage).unwrap(), queued_total(storage).unwrap());

        for (time, address, amount) in &entries {
            let account = lockup_account(storage, address).unwrap();
            prop_assert!(account.is_some());
            let date = crate::date::date_from_unlock_time(*time).unwrap();
            let stored = account.and_then(|account| {
                account.schedule().find(date).map(|(_, lock)| lock.amount)
            });
            prop_assert_eq!(Some(*amount), stored);
        }

        for name in ACCOUNTS {
            for (date, amount) in self.active_locks(name) {
                let key = (unlock_time(date).unwrap(), Addr::unchecked(name), amount);
                prop_assert_eq!(1, entries.iter().filter(|entry| **entry == key).count());
            }
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn queue_mirrors_schedules(ops in prop::collection::vec(op(), 1..60)) {
        let mut chain = Chain::new();
        for op in &ops {
            chain.apply(op)?;
            chain.check()?;
        }
    }

    #[test]
    fn sweep_is_idempotent(
        locks in prop::collection::vec((0..3usize, 6..=24u32, 1..1_000u128), 1..20),
        days in 0..800u64,
    ) {
        let mut chain = Chain::new();
        for (who, months, amount) in locks {
            chain.apply(&Op::Lock { who, months, amount })?;
        }
        chain.now = chain.now.plus_seconds(days * SECONDS_PER_DAY);
        let env = chain.env();

        end_block(chain.deps.as_mut(), &env).unwrap();
        let entries = queue_entries(chain.deps.as_ref().storage).unwrap();
        let total = total_locked(chain.deps.as_ref().storage).unwrap();

        let res = end_block(chain.deps.as_mut(), &env).unwrap();
        prop_assert!(res.events.is_empty());
        prop_assert_eq!(entries, queue_entries(chain.deps.as_ref().storage).unwrap());
        prop_assert_eq!(total, total_locked(chain.deps.as_ref().storage).unwrap());
        chain.check()?;
    }

    #[test]
    fn spend_accepted_iff_unlocked(
        balance in 0..10_000u128,
        delegated in 0..10_000u128,
        locked in 1..10_000u128,
        amount in 0..20_000u128,
    ) {
        let mut deps = mock_dependencies();
        let mut bank = MockBank::default();
        let mut staking = MockStaking::new(BOND_DENOM, &[VALIDATOR]);
        let alice = Addr::unchecked("alice");

        let mut account = load_or_upgrade(deps.as_mut().storage, &alice).unwrap();
        crate::lockup::add_lock(
            deps.as_mut().storage,
            &mut account,
            NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            Uint128::new(locked),
        )
        .unwrap();
        save_lockup_account(deps.as_mut().storage, &account).unwrap();
        if delegated > 0 {
            staking.delegate(&alice, VALIDATOR, Uint128::new(delegated)).unwrap();
        }
        bank.set_balance("alice", balance);

        let validator =
            BackingValidator::new(deps.as_ref(), &bank, &staking, noon("2026-06-01")).unwrap();

        let send = TxMsg::Send {
            from_address: "alice".into(),
            to_address: "bob".into(),
            amount: coins(amount, BOND_DENOM),
        };
        let shortfall = locked.saturating_sub(delegated);
        let expected = shortfall == 0 || amount <= balance.saturating_sub(shortfall);
        prop_assert_eq!(expected, validator.validate_msgs(&[send]).is_ok());

        let undelegate = TxMsg::Undelegate {
            delegator_address: "alice".into(),
            validator_address: VALIDATOR.into(),
            amount: coin(amount.min(delegated), BOND_DENOM),
        };
        let expected = delegated - amount.min(delegated) >= locked;
        prop_assert_eq!(expected, validator.validate_msgs(&[undelegate]).is_ok());
    }
}
