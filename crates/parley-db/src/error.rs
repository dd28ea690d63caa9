use std::sync::PoisonError;

use thiserror::Error;

/// Storage-layer failures, pre-classified for the API boundary: referential
/// misses become `NotFound`, transient lock/connection pressure becomes
/// `Unavailable`, everything else stays a database error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("referenced row not found")]
    NotFound,

    #[error("database unavailable")]
    Unavailable,

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(e, _) => {
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                    StoreError::NotFound
                } else {
                    match e.code {
                        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                            StoreError::Unavailable
                        }
                        _ => StoreError::Sqlite(err),
                    }
                }
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Unavailable
    }
}
