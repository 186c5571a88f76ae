use std::env;

use super::must_var;
use crate::error::AppError;

/// Which record store backs the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DbKind {
    Postgres,
    /// SQLite in memory; used by tests and local runs.
    SqliteMemory,
}

impl DbKind {
    pub fn from_env() -> DbKind {
        match env::var("DB_KIND").as_deref() {
            Ok("sqlite") | Ok("sqlite_memory") => DbKind::SqliteMemory,
            _ => DbKind::Postgres,
        }
    }
}

/// Connection string for the given store kind.
pub fn database_url(kind: &DbKind) -> Result<String, AppError> {
    match kind {
        DbKind::Postgres => {
            let url = must_var("DATABASE_URL")?;
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(AppError::config(
                    "DATABASE_URL must be a postgres connection string",
                ));
            }
            Ok(url)
        }
        DbKind::SqliteMemory => Ok("sqlite::memory:".to_string()),
    }
}

pub fn redis_url() -> Result<String, AppError> {
    Ok(env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn postgres_requires_database_url() {
        env::remove_var("DATABASE_URL");
        let err = database_url(&DbKind::Postgres).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));

        env::set_var("DATABASE_URL", "mysql://nope");
        assert!(database_url(&DbKind::Postgres).is_err());

        env::set_var("DATABASE_URL", "postgres://app@localhost/blackjack");
        assert_eq!(
            database_url(&DbKind::Postgres).unwrap(),
            "postgres://app@localhost/blackjack"
        );
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn sqlite_needs_no_environment() {
        assert_eq!(
            database_url(&DbKind::SqliteMemory).unwrap(),
            "sqlite::memory:"
        );
    }
}
