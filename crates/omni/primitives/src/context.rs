use std::fmt;

use alloy_primitives::{Address, B256};

/// Where a user operation failure happened, so an operator can look it up on the
/// relay or a block explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpContext {
    pub chain_id: u64,
    pub wallet: Address,
    pub user_op_hash: Option<B256>,
}

impl OpContext {
    pub fn new(chain_id: u64, wallet: Address) -> Self {
        Self {
            chain_id,
            wallet,
            user_op_hash: None,
        }
    }

    pub fn with_hash(mut self, user_op_hash: B256) -> Self {
        self.user_op_hash = Some(user_op_hash);
        self
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain {} wallet {}", self.chain_id, self.wallet)?;
        if let Some(hash) = self.user_op_hash {
            write!(f, " user operation {hash}")?;
        }
        Ok(())
    }
}
