pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::SeaOrmRepositoryProvider;

use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use migrator::Migrator;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./bike-rental.db?mode=rwc")
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./bike-rental.db?mode=rwc".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Private in-memory SQLite database
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

/// Initialize database connection
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!("Connecting to database: {}", config.url);
    let db = Database::connect(&config.url).await?;
    info!("Database connected successfully");
    Ok(db)
}

/// Connect and bring the schema up to date
pub async fn init_database_with_migrations(
    config: &DatabaseConfig,
) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let db = init_database(config).await?;
    info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    info!("Migrations completed");
    Ok(db)
}
