#[cfg(not(any(feature = "db-sqlite", feature = "db-postgres")))]
compile_error!("Either the `db-sqlite` or `db-postgres` feature must be enabled.");

#[cfg(all(feature = "db-sqlite", feature = "db-postgres"))]
compile_error!("Only one of `db-sqlite` or `db-postgres` can be enabled.");

#[cfg(feature = "db-postgres")]
pub use sqlx::postgres::{PgPool as DbPool, PgPoolOptions as DbPoolOptions, Postgres as Db};

#[cfg(feature = "db-sqlite")]
pub use sqlx::sqlite::{Sqlite as Db, SqlitePool as DbPool, SqlitePoolOptions as DbPoolOptions};

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::UserProfile;
use sqlx::migrate::Migrator;

use crate::config::DatabaseConfig;
use crate::error::{AppError, StartupError};

#[cfg(feature = "db-sqlite")]
static MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

#[cfg(feature = "db-postgres")]
static MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");

const USER_COLUMNS: &str = "id, login_name, password_hash, display_name, email, created_at";

// --- User row ---

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub login_name: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            login_name: self.login_name.clone(),
            name: self.display_name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields of a user about to be inserted. The hash is already computed.
#[derive(Debug)]
pub struct NewUser {
    pub login_name: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// Owns the connection pool for the lifetime of the server.
#[derive(Clone, Debug)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Opens a bounded pool and checks the store answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StartupError> {
        tracing::info!(
            max_connections = config.max_connections,
            "Connecting to database..."
        );

        let pool = DbPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(config.idle_timeout_secs.map(Duration::from_secs))
            .max_lifetime(config.max_lifetime_secs.map(Duration::from_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to database: {}", e);
                StartupError::StoreUnavailable(e)
            })?;

        let db = Self { pool };
        db.ping().await.map_err(|e| {
            tracing::error!("Database did not answer ping: {}", e);
            StartupError::StoreUnavailable(e)
        })?;

        tracing::info!("Database connection established.");
        Ok(db)
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Brings the schema up to date. Migrations only ever add.
    pub async fn sync(&self) -> Result<(), StartupError> {
        tracing::info!("Running database migrations...");
        match MIGRATOR.run(&self.pool).await {
            Ok(()) => {
                tracing::info!("Migrations complete.");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Migrations failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn close(&self) {
        tracing::info!("Closing database pool.");
        self.pool.close().await;
    }

    // --- Users ---

    pub async fn find_user_by_login_name(&self, login_name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Db, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login_name = $1"
        ))
        .bind(login_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Db, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Inserts a user. A clash on the unique login-name index is a `Conflict`.
    pub async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<Db, User>(&format!(
            "INSERT INTO users (login_name, password_hash, display_name, email, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.login_name)
        .bind(&new_user.password_hash)
        .bind(&new_user.display_name)
        .bind(&new_user.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict(
                    "User with this login name already exists".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Db, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
