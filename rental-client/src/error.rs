/// Errors raised by the database layer.
#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: i64 },
    #[error("unknown column '{column}' for table {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error("invalid page request: {0}")]
    InvalidPage(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}
