use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::{get_job_schedule, initialize_app_state_with_url};
use crate::router::create_router;

pub async fn serve(database_url: &str, bind_address: &str) -> Result<()> {
    info!("CashMind application starting up");
    debug!("Database URL: {}", database_url);
    debug!("Bind address: {}", bind_address);

    // Initialize application state
    let state = match initialize_app_state_with_url(database_url).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    // Start the recurring-transaction scheduler. The handle owns the timer
    // task and is shut down when the server exits.
    let schedule = get_job_schedule()?;
    let scheduler = jobs::scheduler::start_jobs(state.db.clone(), schedule);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            scheduler.shutdown().await;
            return Err(e.into());
        }
    };

    info!("CashMind API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    let served = axum::serve(listener, app).await;

    scheduler.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
