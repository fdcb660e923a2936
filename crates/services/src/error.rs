use thiserror::Error;

use crate::{auth::AuthError, completion::CompletionError, dao::DaoError};

/// Failure of a multi-step service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
