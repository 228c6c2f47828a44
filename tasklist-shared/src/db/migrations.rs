/// Embedded schema migrations
///
/// Migration files live in `migrations/` at the workspace root and are
/// compiled into the binary, so a deployed server carries its own schema.
///
/// ```text
/// migrations/
///   20250101000001_create_users.sql
///   20250101000002_create_tasks.sql
/// ```

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{error, info};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every pending migration
///
/// # Errors
///
/// Returns the sqlx migrate error if any migration fails; already-applied
/// migrations are left in place.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert!(versions.len() >= 2);
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_migrations_define_both_tables() {
        let sql: String = MIGRATOR.iter().map(|m| m.sql.as_ref()).collect();

        assert!(sql.contains("CREATE TABLE users"));
        assert!(sql.contains("CREATE TABLE tasks"));
        assert!(sql.contains("task_status"));
    }
}
