use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. For external identities
    /// this means another request linked the same identity first.
    #[error("record already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
    #[error("database lock poisoned: {0}")]
    Poisoned(String),
    #[error("storage task failed: {0}")]
    Interrupted(String),
    #[error("no unused account number found after {0} attempts")]
    Exhausted(usize),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Duplicate
            }
            _ => StoreError::Sqlite(err),
        }
    }
}
