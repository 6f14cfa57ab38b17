use thiserror::Error;

use crate::domain::{Role, TxnKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Party not found: {0}")]
    PartyNotFound(String),

    #[error("Party already exists: {0}")]
    PartyAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Debt not found: {0}")]
    DebtNotFound(String),

    #[error("Party is archived: {0}")]
    PartyArchived(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("A {kind} cannot be recorded against a {role} account")]
    KindNotAllowedForRole { kind: TxnKind, role: Role },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
