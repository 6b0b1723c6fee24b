use tickerdash_core::DashboardConfig;
use tickerdash_web::AppState;

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(args: &ServeArgs, mut config: DashboardConfig) -> Result<(), CliError> {
    if let Some(bind) = &args.bind {
        config.bind.clone_from(bind);
    }
    config.validate()?;

    let state = AppState::from_config(&config)?;
    tracing::info!(
        bind = %config.bind,
        source = state.service.source_name(),
        "starting dashboard"
    );
    tickerdash_web::serve(state, &config.bind).await?;
    Ok(())
}
