use cosmwasm_std::{Addr, Coin, Decimal, StdError, StdResult, Uint128};

/// Upper bound of delegations summed per delegator.
pub const MAX_DELEGATIONS: u16 = 1000;

pub trait BankKeeper {
    fn balance(&self, address: &Addr, denom: &str) -> StdResult<Uint128>;

    fn send_coins(&mut self, from: &Addr, to: &Addr, coins: &[Coin]) -> StdResult<()>;
}

pub trait StakingKeeper {
    fn bond_denom(&self) -> StdResult<String>;

    fn delegations(&self, delegator: &Addr, limit: u16) -> StdResult<Vec<Delegation>>;

    fn validator(&self, address: &str) -> StdResult<Option<Validator>>;

    /// Bonds `amount` from `delegator` to `validator`, returning the new shares.
    fn delegate(&mut self, delegator: &Addr, validator: &str, amount: Uint128)
        -> StdResult<Decimal>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub validator: String,
    pub shares: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: String,
    pub tokens: Uint128,
    pub delegator_shares: Decimal,
}

impl Validator {
    /// Tokens backing `shares`, truncated to whole units.
    pub fn tokens_from_shares(&self, shares: Decimal) -> Uint128 {
        if self.delegator_shares.is_zero() {
            return Uint128::zero();
        }
        shares
            .atomics()
            .multiply_ratio(self.tokens, self.delegator_shares.atomics())
    }
}

/// Sum of tokens over all of `delegator`'s delegations.
pub fn total_delegated(staking: &dyn StakingKeeper, delegator: &Addr) -> StdResult<Uint128> {
    let mut total = Uint128::zero();
    for delegation in staking.delegations(delegator, MAX_DELEGATIONS)? {
        let validator = staking
            .validator(&delegation.validator)?
            .ok_or_else(|| StdError::not_found(format!("validator {}", delegation.validator)))?;
        total = total.checked_add(validator.tokens_from_shares(delegation.shares))?;
    }
    Ok(total)
}
