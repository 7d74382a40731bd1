use cosmwasm_std::{Addr, Coin, Deps, StdResult, Timestamp, Uint128};

use crate::account::{lockup_account, LockupAccount};
use crate::error::ContractError;
use crate::keepers::{total_delegated, BankKeeper, StakingKeeper};
use crate::tx::{Outflow, TxMsg};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backing {
    pub locked: Uint128,
    pub delegated: Uint128,
}

impl Backing {
    pub fn fully_backed(&self) -> bool {
        self.delegated >= self.locked
    }

    /// Locked value not covered by delegations.
    pub fn shortfall(&self) -> Uint128 {
        self.locked.saturating_sub(self.delegated)
    }
}

pub fn locked_above_delegated(
    account: &LockupAccount,
    staking: &dyn StakingKeeper,
    now: Timestamp,
) -> StdResult<Backing> {
    Ok(Backing {
        locked: account.schedule().locked_amount(now),
        delegated: total_delegated(staking, account.address())?,
    })
}

/// Validates the messages of one transaction against the state as it was
/// before the transaction; it never writes.
pub struct BackingValidator<'a> {
    deps: Deps<'a>,
    bank: &'a dyn BankKeeper,
    staking: &'a dyn StakingKeeper,
    now: Timestamp,
    bond_denom: String,
}

impl<'a> BackingValidator<'a> {
    pub fn new(
        deps: Deps<'a>,
        bank: &'a dyn BankKeeper,
        staking: &'a dyn StakingKeeper,
        now: Timestamp,
    ) -> StdResult<Self> {
        Ok(BackingValidator {
            deps,
            bank,
            staking,
            now,
            bond_denom: staking.bond_denom()?,
        })
    }

    pub fn validate_msgs(&self, msgs: &[TxMsg]) -> Result<(), ContractError> {
        for msg in msgs {
            for outflow in msg.outflows(&self.bond_denom) {
                match outflow {
                    Outflow::Spend { spender, coins } => self.check_spend(spender, &coins)?,
                    Outflow::Undelegate { delegator, amount } => {
                        self.check_undelegate(delegator, amount)?
                    }
                    Outflow::Nested(inner) => self.validate_msgs(inner)?,
                }
            }
        }
        Ok(())
    }

    fn lockup_account(&self, address: &str) -> Result<Option<LockupAccount>, ContractError> {
        let addr = self
            .deps
            .api
            .addr_validate(address)
            .map_err(|err| ContractError::InvalidAddress {
                address: address.to_string(),
                reason: err.to_string(),
            })?;
        Ok(lockup_account(self.deps.storage, &addr)?)
    }

    /// Every bond-denominated coin must fit in `balance - shortfall`
    /// unless the account is fully backed by delegations.
    fn check_spend(&self, spender: &str, coins: &[Coin]) -> Result<(), ContractError> {
        let account = match self.lockup_account(spender)? {
            Some(account) => account,
            None => return Ok(()),
        };
        let backing = locked_above_delegated(&account, self.staking, self.now)?;
        if backing.fully_backed() {
            return Ok(());
        }

        let address: &Addr = account.address();
        for coin in coins.iter().filter(|c| c.denom == self.bond_denom) {
            let balance = self.bank.balance(address, &coin.denom)?;
            let available = balance.saturating_sub(backing.shortfall());
            if available < coin.amount {
                return Err(ContractError::InsufficientUnlockedBalance {
                    available,
                    required: coin.amount,
                });
            }
        }
        Ok(())
    }

    /// Unbonding may never leave less delegated than locked, whatever the
    /// liquid balance.
    fn check_undelegate(&self, delegator: &str, amount: &Coin) -> Result<(), ContractError> {
        let account = match self.lockup_account(delegator)? {
            Some(account) => account,
            None => return Ok(()),
        };
        let backing = locked_above_delegated(&account, self.staking, self.now)?;
        match backing.delegated.checked_sub(amount.amount) {
            Ok(remaining) if remaining >= backing.locked => Ok(()),
            _ => Err(ContractError::UndelegateBelowLocked {
                delegated: backing.delegated,
                amount: amount.amount,
                locked: backing.locked,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{load_or_upgrade, save_lockup_account};
    use crate::date::parse_date;
    use crate::mock::{mock_env_at, MockBank, MockStaking, BOND_DENOM, VALIDATOR};
    use crate::tx::{Authorization, BasicAllowance, FeeAllowance, Input, Output};
    use cosmwasm_std::testing::{mock_dependencies, MockApi, MockQuerier, MockStorage};
    use cosmwasm_std::{coin, coins, OwnedDeps};

    const TODAY: &str = "2026-10-16";

    struct Setup {
        deps: OwnedDeps<MockStorage, MockApi, MockQuerier>,
        bank: MockBank,
        staking: MockStaking,
    }

    /// alice: 1000 locked until 2027-10-16, `delegated` bonded, `balance` liquid.
    fn setup(delegated: u128, balance: u128) -> Setup {
        let mut deps = mock_dependencies();
        let mut bank = MockBank::default();
        let mut staking = MockStaking::new(BOND_DENOM, &[VALIDATOR]);

        let alice = Addr::unchecked("alice");
        let mut account = load_or_upgrade(deps.as_mut().storage, &alice).unwrap();
        account
            .schedule_mut()
            .upsert(parse_date("2027-10-16").unwrap(), Uint128::new(1000))
            .unwrap();
        save_lockup_account(deps.as_mut().storage, &account).unwrap();

        if delegated > 0 {
            staking
                .delegate(&alice, VALIDATOR, Uint128::new(delegated))
                .unwrap();
        }
        bank.set_balance("alice", balance);
        Setup {
            deps,
            bank,
            staking,
        }
    }

    fn validate(setup: &Setup, date: &str, msgs: &[TxMsg]) -> Result<(), ContractError> {
        let env = mock_env_at(date);
        BackingValidator::new(
            setup.deps.as_ref(),
            &setup.bank,
            &setup.staking,
            env.block.time,
        )
        .unwrap()
        .validate_msgs(msgs)
    }

    fn send(from: &str, amount: u128) -> TxMsg {
        TxMsg::Send {
            from_address: from.into(),
            to_address: "bob".into(),
            amount: coins(amount, BOND_DENOM),
        }
    }

    #[test]
    fn backing_math() {
        let backing = Backing {
            locked: Uint128::new(1000),
            delegated: Uint128::new(900),
        };
        assert!(!backing.fully_backed());
        assert_eq!(Uint128::new(100), backing.shortfall());

        let covered = Backing {
            locked: Uint128::new(1000),
            delegated: Uint128::new(1000),
        };
        assert!(covered.fully_backed());
        assert_eq!(Uint128::zero(), covered.shortfall());
    }

    #[test]
    fn fully_backed_spends_freely() {
        let setup = setup(1000, 500);
        validate(&setup, TODAY, &[send("alice", 500)]).unwrap();
    }

    #[test]
    fn shortfall_limits_spend() {
        let mut setup = setup(1000, 500);
        setup.staking.unbond("alice", VALIDATOR, 100);

        match validate(&setup, TODAY, &[send("alice", 401)]) {
            Err(ContractError::InsufficientUnlockedBalance {
                available,
                required,
            }) => {
                assert_eq!(Uint128::new(400), available);
                assert_eq!(Uint128::new(401), required);
            }
            _ => panic!("Must return InsufficientUnlockedBalance error"),
        }
        validate(&setup, TODAY, &[send("alice", 400)]).unwrap();

        // other denominations are not constrained
        let atom = TxMsg::Send {
            from_address: "alice".into(),
            to_address: "bob".into(),
            amount: coins(10_000, "uatom"),
        };
        validate(&setup, TODAY, &[atom]).unwrap();
    }

    #[test]
    fn expired_locks_do_not_constrain() {
        let setup = setup(0, 500);
        assert!(validate(&setup, TODAY, &[send("alice", 1)]).is_err());
        validate(&setup, "2027-10-16", &[send("alice", 500)]).unwrap();
    }

    #[test]
    fn plain_accounts_pass() {
        let setup = setup(0, 0);
        validate(&setup, TODAY, &[send("carol", 1_000_000)]).unwrap();
    }

    #[test]
    fn invalid_address() {
        let setup = setup(0, 0);
        match validate(&setup, TODAY, &[send("INVALID", 1)]) {
            Err(ContractError::InvalidAddress { address, .. }) => assert_eq!("INVALID", address),
            _ => panic!("Must return InvalidAddress error"),
        }
    }

    #[test]
    fn undelegate_keeps_backing() {
        let setup = setup(1200, 0);
        let undelegate = |amount| TxMsg::Undelegate {
            delegator_address: "alice".into(),
            validator_address: VALIDATOR.into(),
            amount: coin(amount, BOND_DENOM),
        };
        validate(&setup, TODAY, &[undelegate(200)]).unwrap();
        match validate(&setup, TODAY, &[undelegate(201)]) {
            Err(ContractError::UndelegateBelowLocked {
                delegated,
                amount,
                locked,
            }) => {
                assert_eq!(Uint128::new(1200), delegated);
                assert_eq!(Uint128::new(201), amount);
                assert_eq!(Uint128::new(1000), locked);
            }
            _ => panic!("Must return UndelegateBelowLocked error"),
        }
    }

    #[test]
    fn undelegate_more_than_delegated() {
        // lockup account whose only lock has expired: nothing locked, 100 bonded
        let setup = setup(100, 0);
        let undelegate = |amount| TxMsg::Undelegate {
            delegator_address: "alice".into(),
            validator_address: VALIDATOR.into(),
            amount: coin(amount, BOND_DENOM),
        };
        validate(&setup, "2027-10-16", &[undelegate(100)]).unwrap();
        match validate(&setup, "2027-10-16", &[undelegate(500)]) {
            Err(ContractError::UndelegateBelowLocked {
                delegated, locked, ..
            }) => {
                assert_eq!(Uint128::new(100), delegated);
                assert_eq!(Uint128::zero(), locked);
            }
            _ => panic!("Must return UndelegateBelowLocked error"),
        }
    }

    #[test]
    fn multi_send_checks_each_input() {
        let setup = setup(0, 500);
        let multi = TxMsg::MultiSend {
            inputs: vec![
                Input {
                    address: "carol".into(),
                    coins: coins(10, BOND_DENOM),
                },
                Input {
                    address: "alice".into(),
                    coins: coins(10, BOND_DENOM),
                },
            ],
            outputs: vec![Output {
                address: "bob".into(),
                coins: coins(20, BOND_DENOM),
            }],
        };
        assert!(matches!(
            validate(&setup, TODAY, &[multi]),
            Err(ContractError::InsufficientUnlockedBalance { .. })
        ));
    }

    #[test]
    fn exec_is_unwrapped() {
        let setup = setup(0, 500);
        let exec = TxMsg::Exec {
            grantee: "bob".into(),
            msgs: vec![TxMsg::Exec {
                grantee: "bob".into(),
                msgs: vec![send("alice", 1)],
            }],
        };
        assert!(matches!(
            validate(&setup, TODAY, &[exec]),
            Err(ContractError::InsufficientUnlockedBalance { .. })
        ));
    }

    #[test]
    fn deeply_nested_exec() {
        let setup = setup(0, 500);
        let nest = |msg: TxMsg| {
            (0..32).fold(msg, |inner, _| TxMsg::Exec {
                grantee: "bob".into(),
                msgs: vec![inner],
            })
        };
        // plain account at any depth
        validate(&setup, TODAY, &[nest(send("carol", 1_000_000))]).unwrap();
        assert!(matches!(
            validate(&setup, TODAY, &[nest(send("alice", 1))]),
            Err(ContractError::InsufficientUnlockedBalance { .. })
        ));
    }

    #[test]
    fn grants_and_pool_deposits() {
        let setup = setup(800, 300);
        // shortfall 200, available 100
        let cases = vec![
            TxMsg::Grant {
                granter: "alice".into(),
                grantee: "bob".into(),
                authorization: Authorization::Send {
                    spend_limit: coins(101, BOND_DENOM),
                    allow_list: vec![],
                },
                expiration: None,
            },
            TxMsg::Deposit {
                proposal_id: 1,
                depositor: "alice".into(),
                amount: coins(101, BOND_DENOM),
            },
            TxMsg::FundCommunityPool {
                depositor: "alice".into(),
                amount: coins(101, BOND_DENOM),
            },
            TxMsg::GrantAllowance {
                granter: "alice".into(),
                grantee: "bob".into(),
                allowance: FeeAllowance::AllowedMsg {
                    allowance: Box::new(FeeAllowance::Basic(BasicAllowance {
                        spend_limit: Some(coins(101, BOND_DENOM)),
                        expiration: None,
                    })),
                    allowed_messages: vec![],
                },
            },
            TxMsg::Transfer {
                source_port: "transfer".into(),
                source_channel: "channel-0".into(),
                sender: "alice".into(),
                receiver: "osmo1abc".into(),
                token: coin(101, BOND_DENOM),
            },
        ];
        for msg in cases {
            match validate(&setup, TODAY, &[msg.clone()]) {
                Err(ContractError::InsufficientUnlockedBalance { available, .. }) => {
                    assert_eq!(Uint128::new(100), available, "{}", msg.kind())
                }
                _ => panic!("{} must be rejected", msg.kind()),
            }
        }

        let unlimited = TxMsg::GrantAllowance {
            granter: "alice".into(),
            grantee: "bob".into(),
            allowance: FeeAllowance::Basic(BasicAllowance {
                spend_limit: None,
                expiration: None,
            }),
        };
        validate(&setup, TODAY, &[unlimited]).unwrap();
    }

    #[test]
    fn checks_use_pre_transaction_state() {
        // two sends that each fit but together exceed the available amount
        // are both judged against the same snapshot
        let mut setup = setup(1000, 500);
        setup.staking.unbond("alice", VALIDATOR, 100);
        validate(&setup, TODAY, &[send("alice", 400), send("alice", 400)]).unwrap();
    }
}
