use protecta_core::AppError;

/// Maps a sqlx error to the application error taxonomy.
///
/// Connectivity failures become `StorageUnavailable` so callers on the
/// evaluation path can distinguish "store is down" from a broken query.
pub(crate) fn map_storage_error(error: sqlx::Error, context: &str) -> AppError {
    match &error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            AppError::StorageUnavailable(format!("{context}: {error}"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}

/// Returns whether the error is a PostgreSQL unique-constraint violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error)
            if database_error.code().as_deref() == Some("23505")
    )
}
