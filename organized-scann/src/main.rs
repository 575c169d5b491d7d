use anyhow::Context;
use organized_scann::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config).context("failed to initialize tracing")?;

    let state = AppState::builder()
        .config(config.clone())
        .build()
        .await
        .context("failed to build application state")?;

    Server::new(config)
        .serve(build_router(state))
        .await
        .context("server error")
}
