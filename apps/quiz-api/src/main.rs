use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use quiz_api::{Application, FeatureRouters};
use std::time::Instant;
use tracing::{error, info, warn};

use axum_helpers::DrainOutcome;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let started_at = Instant::now();

    // Install color-eyre first for colored error output
    install_color_eyre();

    init_tracing(&Environment::from_env());

    let app = Application::from_env(started_at).await.inspect_err(|e| {
        error!("Startup failed: {}", e);
    })?;

    let outcome = app
        .run(FeatureRouters::default())
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    match outcome {
        DrainOutcome::Completed => info!("Quiz API shutdown complete"),
        DrainOutcome::Failed(reason) => warn!("Quiz API stopped, cleanup failed: {}", reason),
        DrainOutcome::TimedOut(limit) => warn!("Quiz API stopped, cleanup exceeded {:?}", limit),
    }

    Ok(())
}
