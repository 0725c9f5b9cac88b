use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not insert the record. {0}")]
    InsertError(String),
    #[error("Stored data is invalid. {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StorageError::InsertError(db.to_string()),
            e => StorageError::DatabaseError(e.to_string()),
        }
    }
}
