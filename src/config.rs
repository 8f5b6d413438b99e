use anyhow::{Context, Result};
use jobs::scheduler::JobSchedule;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;

use crate::auth::AuthConfig;
use crate::schemas::AppState;

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://cashmind.db".to_string());

    initialize_app_state_with_url(&database_url).await
}

pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    dotenvy::dotenv().ok();

    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Bearer-token user lookups are cached briefly so the auth extractor
    // does not hit the database on every request.
    let user_cache = Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build();

    Ok(AppState {
        db,
        user_cache,
        auth: auth_config_from_env()?,
    })
}

pub fn auth_config_from_env() -> Result<AuthConfig> {
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "jwt_secret".to_string());
    let ttl_hours = std::env::var("JWT_EXPIRES_IN_HOURS")
        .ok()
        .map(|v| v.parse::<i64>())
        .transpose()
        .context("JWT_EXPIRES_IN_HOURS must be an integer number of hours")?
        .unwrap_or(24);

    Ok(AuthConfig::new(jwt_secret, ttl_hours))
}

/// Cadence for the recurring-transaction job, from `RECURRING_JOB_SCHEDULE`
/// (`daily@HH:MM` UTC or `every@<seconds>s`). Defaults to shortly past
/// midnight UTC.
pub fn get_job_schedule() -> Result<JobSchedule> {
    match std::env::var("RECURRING_JOB_SCHEDULE") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid RECURRING_JOB_SCHEDULE: {raw:?}")),
        Err(_) => Ok(JobSchedule::default()),
    }
}
