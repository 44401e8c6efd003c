// sqlx::Error -> AppError mapping

use waitroom_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
///
/// Every store failure is fatal for the current request.
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            match db_err.code() {
                // SQLite error codes: https://www.sqlite.org/rescode.html
                Some(code) => match code.as_ref() {
                    "2067" | "1555" => {
                        AppError::StoreUnavailable(format!("Unique constraint violation: {}", message))
                    }
                    "5" => AppError::StoreUnavailable(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        message
                    )),
                    "13" => AppError::StoreUnavailable(format!("Database full: {}", message)),
                    other => AppError::StoreUnavailable(format!(
                        "Database error [{}]: {}",
                        other, message
                    )),
                },
                None => AppError::StoreUnavailable(format!("Database error: {}", message)),
            }
        }
        sqlx::Error::RowNotFound => AppError::StoreUnavailable("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::StoreUnavailable(format!("Column not found: {}", col))
        }
        sqlx::Error::PoolTimedOut => {
            AppError::StoreUnavailable("Timed out acquiring a connection".to_string())
        }
        // Connection, pool, protocol errors
        _ => AppError::StoreUnavailable(err.to_string()),
    }
}
