use thiserror::Error;

use crate::analyzer::SyntaxError;
use crate::config::ConfigError;
use crate::eval::EvalError;
use crate::repository::RepositoryError;
use crate::selner::CoordinatorError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;
