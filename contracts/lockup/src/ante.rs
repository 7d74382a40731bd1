use cosmwasm_std::{Deps, Env};
use tracing::warn;

use crate::backing::BackingValidator;
use crate::error::ContractError;
use crate::keepers::{BankKeeper, StakingKeeper};
use crate::tx::Tx;

/// Runs before a transaction executes. Rejects it when any of its messages
/// would move locked value that delegations do not cover.
pub fn ante_handle(
    deps: Deps,
    env: &Env,
    bank: &dyn BankKeeper,
    staking: &dyn StakingKeeper,
    tx: &Tx,
) -> Result<(), ContractError> {
    let validator = BackingValidator::new(deps, bank, staking, env.block.time)?;
    validator.validate_msgs(&tx.msgs).map_err(|err| {
        warn!(
            height = env.block.height,
            signer = tx.msgs.first().map(|msg| msg.signer()).unwrap_or_default(),
            error = %err,
            "transaction rejected"
        );
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{load_or_upgrade, save_lockup_account};
    use crate::date::parse_date;
    use crate::error::ErrorKind;
    use crate::mock::{mock_env_at, MockBank, MockStaking, BOND_DENOM, VALIDATOR};
    use crate::tx::TxMsg;
    use cosmwasm_std::testing::mock_dependencies;
    use cosmwasm_std::{coins, Addr, Uint128};

    #[test]
    fn first_failing_message_rejects() {
        let mut deps = mock_dependencies();
        let mut bank = MockBank::default();
        let staking = MockStaking::new(BOND_DENOM, &[VALIDATOR]);
        bank.set_balance("alice", 100);

        let mut account =
            load_or_upgrade(deps.as_mut().storage, &Addr::unchecked("alice")).unwrap();
        account
            .schedule_mut()
            .upsert(parse_date("2027-06-01").unwrap(), Uint128::new(50))
            .unwrap();
        save_lockup_account(deps.as_mut().storage, &account).unwrap();

        let send = |from: &str, amount| TxMsg::Send {
            from_address: from.into(),
            to_address: "bob".into(),
            amount: coins(amount, BOND_DENOM),
        };
        let env = mock_env_at("2026-10-16");

        let tx = Tx {
            msgs: vec![send("carol", 10), send("alice", 50)],
            fee_payer: None,
        };
        ante_handle(deps.as_ref(), &env, &bank, &staking, &tx).unwrap();

        let tx = Tx {
            msgs: vec![send("carol", 10), send("alice", 51)],
            fee_payer: None,
        };
        let err = ante_handle(deps.as_ref(), &env, &bank, &staking, &tx).unwrap_err();
        assert_eq!(ErrorKind::InsufficientUnlockedBalance, err.kind());
        assert_eq!(
            "insufficient unlocked balance: available 50, required 51",
            err.to_string()
        );
    }
}
