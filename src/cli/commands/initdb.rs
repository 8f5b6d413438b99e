use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{error, info};

pub async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database");

    let db: DatabaseConnection = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Database migrations completed successfully");
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
    }

    info!("Database initialization completed successfully!");
    Ok(())
}
