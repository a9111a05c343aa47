use ms_login_broker::AppState;
use ms_login_broker::api::start_webserver;
use ms_login_broker::config::load_config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "ms_login_broker=info,tower_http=info,hyper=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    let config = load_config()?;
    for variable in config.missing_credentials() {
        tracing::warn!(%variable, "not set; Microsoft logins will be rejected");
    }

    let state = AppState::from_config(&config)?;
    if state.redirect_policy.is_open() {
        tracing::warn!("allowed_redirect_hosts is empty; any http(s) source URL will receive tokens");
    }

    if let Err(e) = start_webserver(state, &config).await {
        tracing::error!(error = %e, "Server forced to shutdown");
        return Err(e.into());
    }

    tracing::info!("Server exiting...");
    Ok(())
}
