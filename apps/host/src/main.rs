use anyhow::Context;
use mora_host::Host;
use mora_logger::Logger;
use mora_wingman::config::load_host_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "host".to_owned());
    let cfg = load_host_config(Some(&path)).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.log)?;

    let outcome = Host::builder()
        .config(cfg)
        .module(mora_custom_image::init())
        .build()
        .await?
        .run(Vec::new())
        .await?;

    tracing::info!(passes = outcome.passes, values = outcome.values.len(), "Host finished");
    Ok(())
}
