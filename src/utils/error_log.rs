use sqlx::MySqlPool;

/// Writes an entry to the error log table and to the tracing log.
/// Failures to persist are only traced; callers are already on an error path.
pub async fn log_error(pool: &MySqlPool, title: &str, message: &str) {
    tracing::error!(title, message, "Error logged");

    if let Err(e) = sqlx::query("INSERT INTO error_logs (title, message) VALUES (?, ?)")
        .bind(title)
        .bind(message)
        .execute(pool)
        .await
    {
        tracing::error!(error = %e, title, "Failed to persist error log entry");
    }
}
