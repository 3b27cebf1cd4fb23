use scenecast_core::ComposerConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    scenecast_api::telemetry::init_telemetry();

    let config = ComposerConfig::from_env()?;

    let (_state, router) = scenecast_api::setup::initialize_app(config.clone()).await?;

    scenecast_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
