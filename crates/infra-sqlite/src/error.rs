// sqlx::Error -> AppError conversion
//
// Orphan rules prevent `impl From<sqlx::Error> for AppError` here, so every
// query maps its error through these helpers.

use leaseq_core::domain::QueueName;
use leaseq_core::error::AppError;

/// Convert sqlx::Error to AppError::Storage with a classified message
///
/// The sqlx error is kept as the `source()` of the result.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    let message = match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => format!("Unique constraint violation: {}", db_err.message()),
                "5" => format!("Database locked (SQLITE_BUSY): {}", db_err.message()),
                "13" => format!("Database full: {}", db_err.message()),
                other => format!("Database error [{}]: {}", other, db_err.message()),
            },
            None => format!("Database error: {}", db_err.message()),
        },
        sqlx::Error::RowNotFound => "Row not found".to_string(),
        sqlx::Error::ColumnNotFound(col) => format!("Column not found: {}", col),
        sqlx::Error::PoolTimedOut => "Connection pool timed out".to_string(),
        // Connection, configuration, protocol errors
        other => other.to_string(),
    };

    AppError::storage(message, err)
}

/// Like `map_sqlx_error`, but a missing table means the queue is not provisioned
pub(crate) fn map_queue_error(queue: &QueueName) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| {
        if is_missing_table(&err) {
            AppError::QueueNotFound(queue.to_string())
        } else {
            map_sqlx_error(err)
        }
    }
}

fn is_missing_table(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("no such table"),
        _ => false,
    }
}
