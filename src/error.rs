//! Application-wide error types.

use thiserror::Error;

use crate::{registration::RegistrationError, sendmail::SendmailError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Mail(#[from] SendmailError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
