use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
}

#[derive(Debug, Clone, Error)]
pub enum DatabaseErrorKind {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {message}")]
    Conflict { message: String },

    #[error("Database connection failure: {message}")]
    Connection { message: String },

    #[error("Stored data is inconsistent: {message}")]
    Corrupted { message: String },

    #[error("Database error: {message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Corrupted { message: message.into() })
    }

    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound {
                entity: "row".to_string(),
                id: String::new(),
            },
            sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseErrorKind::Conflict {
                message: db.message().to_string(),
            },
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                DatabaseErrorKind::Conflict { message: db.message().to_string() }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseErrorKind::Connection { message: err.to_string() }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseErrorKind::Corrupted { message: err.to_string() }
            }
            _ => DatabaseErrorKind::Unknown { message: err.to_string() },
        };
        Self::new(kind)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Connection { .. })
    }
}
