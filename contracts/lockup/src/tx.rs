use cosmwasm_schema::cw_serde;
use cosmwasm_std::{coin, Coin, Timestamp};

use crate::msg::ExecuteMsg;

#[cw_serde]
pub struct Tx {
    pub msgs: Vec<TxMsg>,
    /// Explicit fee payer; the first signer pays otherwise
    pub fee_payer: Option<String>,
}

impl Tx {
    pub fn fee_payer(&self) -> Option<&str> {
        self.fee_payer
            .as_deref()
            .or_else(|| self.msgs.first().map(TxMsg::signer))
    }
}

#[cw_serde]
pub struct Input {
    pub address: String,
    pub coins: Vec<Coin>,
}

#[cw_serde]
pub struct Output {
    pub address: String,
    pub coins: Vec<Coin>,
}

#[cw_serde]
pub enum Authorization {
    /// Lets the grantee spend up to `spend_limit` of the granter's funds
    Send {
        spend_limit: Vec<Coin>,
        allow_list: Vec<String>,
    },
    Generic { msg_type_url: String },
    Stake {
        max_tokens: Option<Coin>,
        validators: Vec<String>,
    },
}

#[cw_serde]
pub struct BasicAllowance {
    /// `None` means unlimited
    pub spend_limit: Option<Vec<Coin>>,
    pub expiration: Option<Timestamp>,
}

#[cw_serde]
pub enum FeeAllowance {
    Basic(BasicAllowance),
    Periodic {
        basic: BasicAllowance,
        period_seconds: u64,
        period_spend_limit: Vec<Coin>,
    },
    AllowedMsg {
        allowance: Box<FeeAllowance>,
        allowed_messages: Vec<String>,
    },
}

impl FeeAllowance {
    /// Overall spend limit, looking through wrapping allowances.
    pub fn spend_limit(&self) -> Option<&[Coin]> {
        match self {
            FeeAllowance::Basic(basic) | FeeAllowance::Periodic { basic, .. } => {
                basic.spend_limit.as_deref()
            }
            FeeAllowance::AllowedMsg { allowance, .. } => allowance.spend_limit(),
        }
    }
}

#[cw_serde]
pub enum TxMsg {
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
    MultiSend {
        inputs: Vec<Input>,
        outputs: Vec<Output>,
    },
    Delegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    Undelegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    /// Executes `msgs` on behalf of their signers
    Exec { grantee: String, msgs: Vec<TxMsg> },
    Grant {
        granter: String,
        grantee: String,
        authorization: Authorization,
        expiration: Option<Timestamp>,
    },
    Deposit {
        proposal_id: u64,
        depositor: String,
        amount: Vec<Coin>,
    },
    FundCommunityPool { depositor: String, amount: Vec<Coin> },
    GrantAllowance {
        granter: String,
        grantee: String,
        allowance: FeeAllowance,
    },
    /// Cross-chain token transfer
    Transfer {
        source_port: String,
        source_channel: String,
        sender: String,
        receiver: String,
        token: Coin,
    },
    Lockup { sender: String, msg: ExecuteMsg },
    Other { type_url: String, signer: String },
}

/// What a message asks of the lockup invariants.
#[derive(Debug, PartialEq)]
pub enum Outflow<'a> {
    /// `spender` pays `coins` out of its liquid balance
    Spend { spender: &'a str, coins: Vec<Coin> },
    /// `delegator` unbonds `amount`
    Undelegate { delegator: &'a str, amount: &'a Coin },
    /// Inner messages that must be checked in turn
    Nested(&'a [TxMsg]),
}

impl TxMsg {
    pub fn signer(&self) -> &str {
        match self {
            TxMsg::Send { from_address, .. } => from_address.as_str(),
            TxMsg::MultiSend { inputs, .. } => inputs.first().map_or("", |i| i.address.as_str()),
            TxMsg::Delegate {
                delegator_address, ..
            }
            | TxMsg::Undelegate {
                delegator_address, ..
            } => delegator_address.as_str(),
            TxMsg::Exec { grantee, .. } => grantee.as_str(),
            TxMsg::Grant { granter, .. } | TxMsg::GrantAllowance { granter, .. } => {
                granter.as_str()
            }
            TxMsg::Deposit { depositor, .. } | TxMsg::FundCommunityPool { depositor, .. } => {
                depositor.as_str()
            }
            TxMsg::Transfer { sender, .. } | TxMsg::Lockup { sender, .. } => sender.as_str(),
            TxMsg::Other { signer, .. } => signer.as_str(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TxMsg::Send { .. } => "send",
            TxMsg::MultiSend { .. } => "multi_send",
            TxMsg::Delegate { .. } => "delegate",
            TxMsg::Undelegate { .. } => "undelegate",
            TxMsg::Exec { .. } => "exec",
            TxMsg::Grant { .. } => "grant",
            TxMsg::Deposit { .. } => "deposit",
            TxMsg::FundCommunityPool { .. } => "fund_community_pool",
            TxMsg::GrantAllowance { .. } => "grant_allowance",
            TxMsg::Transfer { .. } => "transfer",
            TxMsg::Lockup { .. } => "lockup",
            TxMsg::Other { .. } => "other",
        }
    }

    /// Classifies the message. Every kind that can move bond-denominated
    /// value away from an account must be listed here; anything else is
    /// passed through with no outflow.
    pub fn outflows(&self, bond_denom: &str) -> Vec<Outflow<'_>> {
        match self {
            TxMsg::Send {
                from_address,
                amount,
                ..
            } => vec![Outflow::Spend {
                spender: from_address,
                coins: amount.clone(),
            }],
            TxMsg::MultiSend { inputs, .. } => inputs
                .iter()
                .map(|input| Outflow::Spend {
                    spender: &input.address,
                    coins: input.coins.clone(),
                })
                .collect(),
            TxMsg::Undelegate {
                delegator_address,
                amount,
                ..
            } if amount.denom == bond_denom => vec![Outflow::Undelegate {
                delegator: delegator_address,
                amount,
            }],
            TxMsg::Exec { msgs, .. } => vec![Outflow::Nested(msgs)],
            TxMsg::Grant {
                granter,
                authorization: Authorization::Send { spend_limit, .. },
                ..
            } => vec![Outflow::Spend {
                spender: granter,
                coins: spend_limit.clone(),
            }],
            TxMsg::Deposit {
                depositor, amount, ..
            }
            | TxMsg::FundCommunityPool { depositor, amount } => vec![Outflow::Spend {
                spender: depositor,
                coins: amount.clone(),
            }],
            TxMsg::GrantAllowance {
                granter, allowance, ..
            } => match allowance.spend_limit() {
                Some(limit) => vec![Outflow::Spend {
                    spender: granter,
                    coins: limit.to_vec(),
                }],
                None => vec![],
            },
            TxMsg::Transfer { sender, token, .. } => vec![Outflow::Spend {
                spender: sender,
                coins: vec![token.clone()],
            }],
            TxMsg::Lockup { sender, msg } => match msg {
                ExecuteMsg::SendDelegateAndLock { amount, .. }
                | ExecuteMsg::MultiSendDelegateAndLock {
                    total_amount: amount,
                    ..
                } => vec![Outflow::Spend {
                    spender: sender,
                    coins: vec![coin(amount.u128(), bond_denom)],
                }],
                ExecuteMsg::Lock { .. }
                | ExecuteMsg::Extend { .. }
                | ExecuteMsg::UpdateConfig { .. } => vec![],
            },
            TxMsg::Undelegate { .. }
            | TxMsg::Grant { .. }
            | TxMsg::Delegate { .. }
            | TxMsg::Other { .. } => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::LockEntry;
    use cosmwasm_std::{coins, Uint128};

    const DENOM: &str = "uopt";

    fn spend<'a>(spender: &'a str, amount: u128) -> Outflow<'a> {
        Outflow::Spend {
            spender,
            coins: coins(amount, DENOM),
        }
    }

    #[test]
    fn direct_transfers() {
        let send = TxMsg::Send {
            from_address: "alice".into(),
            to_address: "bob".into(),
            amount: coins(10, DENOM),
        };
        assert_eq!(vec![spend("alice", 10)], send.outflows(DENOM));

        let multi = TxMsg::MultiSend {
            inputs: vec![
                Input {
                    address: "alice".into(),
                    coins: coins(3, DENOM),
                },
                Input {
                    address: "carol".into(),
                    coins: coins(4, DENOM),
                },
            ],
            outputs: vec![Output {
                address: "bob".into(),
                coins: coins(7, DENOM),
            }],
        };
        assert_eq!(
            vec![spend("alice", 3), spend("carol", 4)],
            multi.outflows(DENOM)
        );

        let transfer = TxMsg::Transfer {
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            sender: "alice".into(),
            receiver: "cosmos1xyz".into(),
            token: coin(5, DENOM),
        };
        assert_eq!(vec![spend("alice", 5)], transfer.outflows(DENOM));
    }

    #[test]
    fn undelegate_only_for_bond_denom() {
        let undelegate = TxMsg::Undelegate {
            delegator_address: "alice".into(),
            validator_address: "val1".into(),
            amount: coin(10, DENOM),
        };
        assert_eq!(
            vec![Outflow::Undelegate {
                delegator: "alice",
                amount: &coin(10, DENOM),
            }],
            undelegate.outflows(DENOM)
        );

        let other = TxMsg::Undelegate {
            delegator_address: "alice".into(),
            validator_address: "val1".into(),
            amount: coin(10, "uatom"),
        };
        assert!(other.outflows(DENOM).is_empty());
    }

    #[test]
    fn grants() {
        let send_grant = TxMsg::Grant {
            granter: "alice".into(),
            grantee: "bob".into(),
            authorization: Authorization::Send {
                spend_limit: coins(50, DENOM),
                allow_list: vec![],
            },
            expiration: None,
        };
        assert_eq!(vec![spend("alice", 50)], send_grant.outflows(DENOM));

        let generic = TxMsg::Grant {
            granter: "alice".into(),
            grantee: "bob".into(),
            authorization: Authorization::Generic {
                msg_type_url: "/cosmos.bank.v1beta1.MsgSend".into(),
            },
            expiration: None,
        };
        assert!(generic.outflows(DENOM).is_empty());
    }

    #[test]
    fn fee_allowances_look_through_wrappers() {
        let basic = |limit: Option<Vec<Coin>>| BasicAllowance {
            spend_limit: limit,
            expiration: None,
        };
        let grant = |allowance| TxMsg::GrantAllowance {
            granter: "alice".into(),
            grantee: "bob".into(),
            allowance,
        };

        let unlimited = grant(FeeAllowance::Basic(basic(None)));
        assert!(unlimited.outflows(DENOM).is_empty());

        let periodic = grant(FeeAllowance::Periodic {
            basic: basic(Some(coins(20, DENOM))),
            period_seconds: 3600,
            period_spend_limit: coins(1, DENOM),
        });
        assert_eq!(vec![spend("alice", 20)], periodic.outflows(DENOM));

        let wrapped = grant(FeeAllowance::AllowedMsg {
            allowance: Box::new(FeeAllowance::AllowedMsg {
                allowance: Box::new(FeeAllowance::Basic(basic(Some(coins(30, DENOM))))),
                allowed_messages: vec![],
            }),
            allowed_messages: vec!["/cosmos.bank.v1beta1.MsgSend".into()],
        });
        assert_eq!(vec![spend("alice", 30)], wrapped.outflows(DENOM));
    }

    #[test]
    fn exec_nests() {
        let inner = vec![TxMsg::FundCommunityPool {
            depositor: "alice".into(),
            amount: coins(1, DENOM),
        }];
        let exec = TxMsg::Exec {
            grantee: "bob".into(),
            msgs: inner.clone(),
        };
        assert_eq!(vec![Outflow::Nested(&inner)], exec.outflows(DENOM));
        assert_eq!("bob", exec.signer());
    }

    #[test]
    fn lockup_sends_spend_bond_denom() {
        let msg = TxMsg::Lockup {
            sender: "alice".into(),
            msg: ExecuteMsg::SendDelegateAndLock {
                to_address: "bob".into(),
                validator_address: "val1".into(),
                amount: Uint128::new(8),
                unlock_date: "2027-10-16".into(),
            },
        };
        assert_eq!(vec![spend("alice", 8)], msg.outflows(DENOM));

        let lock = TxMsg::Lockup {
            sender: "alice".into(),
            msg: ExecuteMsg::Lock {
                locks: vec![LockEntry {
                    unlock_date: "2027-10-16".into(),
                    amount: coin(8, DENOM),
                }],
            },
        };
        assert!(lock.outflows(DENOM).is_empty());
    }

    #[test]
    fn fee_payer_defaults_to_first_signer() {
        let mut tx = Tx {
            msgs: vec![TxMsg::Other {
                type_url: "/x.y.Msg".into(),
                signer: "carol".into(),
            }],
            fee_payer: None,
        };
        assert_eq!(Some("carol"), tx.fee_payer());
        tx.fee_payer = Some("dave".into());
        assert_eq!(Some("dave"), tx.fee_payer());
        assert_eq!(
            None,
            Tx {
                msgs: vec![],
                fee_payer: None
            }
            .fee_payer()
        );
    }
}
