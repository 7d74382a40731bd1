#![cfg(test)]

use std::collections::{BTreeMap, HashMap};

use cosmwasm_std::testing::mock_env;
use cosmwasm_std::{Addr, Coin, Decimal, Env, StdError, StdResult, Timestamp, Uint128};

use crate::date::{parse_date, unlock_time};
use crate::keepers::{BankKeeper, Delegation, StakingKeeper, Validator};

pub const BOND_DENOM: &str = "uopt";
pub const VALIDATOR: &str = "val1";

/// `mock_env` with the block time set to noon UTC of `date`.
pub fn mock_env_at(date: &str) -> Env {
    let mut env = mock_env();
    env.block.time = noon(date);
    env
}

pub fn noon(date: &str) -> Timestamp {
    let midnight = unlock_time(parse_date(date).unwrap()).unwrap();
    Timestamp::from_seconds(midnight + 43_200)
}

#[derive(Default)]
pub struct MockBank {
    balances: HashMap<(Addr, String), Uint128>,
}

impl MockBank {
    pub fn set_balance(&mut self, address: &str, amount: u128) {
        self.balances.insert(
            (Addr::unchecked(address), BOND_DENOM.to_string()),
            Uint128::new(amount),
        );
    }
}

impl BankKeeper for MockBank {
    fn balance(&self, address: &Addr, denom: &str) -> StdResult<Uint128> {
        Ok(self
            .balances
            .get(&(address.clone(), denom.to_string()))
            .copied()
            .unwrap_or_default())
    }

    fn send_coins(&mut self, from: &Addr, to: &Addr, coins: &[Coin]) -> StdResult<()> {
        for coin in coins {
            let from_balance = self.balance(from, &coin.denom)?;
            let remaining = from_balance
                .checked_sub(coin.amount)
                .map_err(|_| StdError::generic_err(format!("insufficient funds: {}", coin)))?;
            self.balances
                .insert((from.clone(), coin.denom.clone()), remaining);
            let to_balance = self.balance(to, &coin.denom)?;
            self.balances
                .insert((to.clone(), coin.denom.clone()), to_balance + coin.amount);
        }
        Ok(())
    }
}

pub struct MockStaking {
    denom: String,
    validators: BTreeMap<String, Validator>,
    delegations: BTreeMap<(Addr, String), Decimal>,
}

impl MockStaking {
    pub fn new(denom: &str, validators: &[&str]) -> Self {
        MockStaking {
            denom: denom.to_string(),
            validators: validators
                .iter()
                .map(|address| {
                    (
                        address.to_string(),
                        Validator {
                            address: address.to_string(),
                            tokens: Uint128::zero(),
                            delegator_shares: Decimal::zero(),
                        },
                    )
                })
                .collect(),
            delegations: BTreeMap::new(),
        }
    }

    /// Reduces every delegation to `validator` by `fraction` of its tokens.
    pub fn slash(&mut self, validator: &str, fraction: Decimal) {
        let v = self.validators.get_mut(validator).unwrap();
        v.tokens = v.tokens - v.tokens * fraction;
    }

    /// Unbonds `amount` tokens of `delegator` from `validator`.
    pub fn unbond(&mut self, delegator: &str, validator: &str, amount: u128) {
        let key = (Addr::unchecked(delegator), validator.to_string());
        let v = self.validators.get_mut(validator).unwrap();
        let shares = Decimal::new(
            Uint128::new(amount).multiply_ratio(v.delegator_shares.atomics(), v.tokens),
        );
        v.tokens -= Uint128::new(amount);
        v.delegator_shares = v.delegator_shares - shares;
        let held = self.delegations.get_mut(&key).unwrap();
        *held = *held - shares;
    }
}

impl StakingKeeper for MockStaking {
    fn bond_denom(&self) -> StdResult<String> {
        Ok(self.denom.clone())
    }

    fn delegations(&self, delegator: &Addr, limit: u16) -> StdResult<Vec<Delegation>> {
        Ok(self
            .delegations
            .iter()
            .filter(|((d, _), _)| d == delegator)
            .take(limit as usize)
            .map(|((_, validator), shares)| Delegation {
                validator: validator.clone(),
                shares: *shares,
            })
            .collect())
    }

    fn validator(&self, address: &str) -> StdResult<Option<Validator>> {
        Ok(self.validators.get(address).cloned())
    }

    fn delegate(
        &mut self,
        delegator: &Addr,
        validator: &str,
        amount: Uint128,
    ) -> StdResult<Decimal> {
        let v = self
            .validators
            .get_mut(validator)
            .ok_or_else(|| StdError::not_found("validator"))?;
        let shares = if v.tokens.is_zero() {
            Decimal::from_ratio(amount, 1u128)
        } else {
            Decimal::new(amount.multiply_ratio(v.delegator_shares.atomics(), v.tokens))
        };
        v.tokens += amount;
        v.delegator_shares = v.delegator_shares + shares;
        let held = self
            .delegations
            .entry((delegator.clone(), validator.to_string()))
            .or_insert_with(Decimal::zero);
        *held = *held + shares;
        Ok(shares)
    }
}
