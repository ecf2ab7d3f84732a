use crate::domain::TransitionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid payment intent: {0}")]
    InvalidIntent(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("unknown gateway '{0}'")]
    UnknownGateway(String),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;
