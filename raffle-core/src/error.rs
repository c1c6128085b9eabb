use crate::types::{AccountId, Amount, RequestId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RaffleError>;

#[derive(Error, Debug)]
pub enum RaffleError {
    #[error("Raffle is not open")]
    RaffleNotOpen,

    #[error("Insufficient entrance fee: need {required}, provided {provided}")]
    InsufficientFee { required: Amount, provided: Amount },

    #[error("Draw not ready: {reason}")]
    DrawNotReady { reason: String },

    #[error("A draw is already in progress")]
    DrawAlreadyInProgress,

    #[error("Caller {0} is not the bound randomness provider")]
    Unauthorized(AccountId),

    #[error("Unknown randomness request: {0}")]
    UnknownRequest(RequestId),

    #[error("Randomness provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Insufficient subscription funding for {subscription_id}: need {required}, have {balance}")]
    InsufficientFunding {
        subscription_id: u64,
        balance: Amount,
        required: Amount,
    },

    #[error("Prize transfer failed: {0}")]
    TransferFailed(String),

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid raffle state: {0}")]
    InvalidState(String),

    #[error("Raffle not found: {name}")]
    RaffleNotFound { name: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RaffleError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn draw_not_ready(reason: impl Into<String>) -> Self {
        Self::DrawNotReady {
            reason: reason.into(),
        }
    }

    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }

    pub fn dialog(msg: impl Into<String>) -> Self {
        Self::Dialog(msg.into())
    }
}

// conversion from dialoguer::Error
impl From<dialoguer::Error> for RaffleError {
    fn from(err: dialoguer::Error) -> Self {
        RaffleError::Dialog(err.to_string())
    }
}
