use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("balance overflow for {recipient}")]
    BalanceOverflow { recipient: String },

    #[error("storage error: {0}")]
    Storage(#[from] tabcoin_store::StoreError),
}
