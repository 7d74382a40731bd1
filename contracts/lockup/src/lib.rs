pub mod abci;
pub mod account;
pub mod ante;
pub mod backing;
pub mod contract;
pub mod date;
mod error;
mod invariants;
pub mod keepers;
pub mod lockup;
mod mock;
pub mod msg;
pub mod post;
pub mod query;
pub mod queue;
pub mod schedule;
pub mod state;
pub mod tx;

pub use crate::error::{ErrorKind, ContractError};
