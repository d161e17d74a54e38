//! TTS Facade Server
//!
//! HTTP facade for text-to-speech synthesis with a Google-Cloud-TTS-compatible API.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tts_facade_common::{Config, HttpServerBuilder, ListenArgs, tracing::init_tracing};
use tts_facade_server::{AppState, CloudTtsProvider, StaticVoiceRegistry, SynthesisFacade, router};

/// Command-line arguments for the facade server.
#[derive(Parser, Debug)]
#[command(name = "tts-facade-server")]
#[command(about = "Google-Cloud-TTS-compatible speech synthesis facade")]
struct Args {
    /// Listener configuration
    #[command(flatten)]
    listen: ListenArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("tts-facade-server starting...");

    let args = Args::parse();

    let config = args.listen.apply(Config::from_env()?);
    tracing::info!(
        provider_endpoint = %config.provider_endpoint,
        timeout_secs = config.request_timeout_secs,
        "Configuration loaded"
    );

    let registry = StaticVoiceRegistry::load(config.voices_file.as_deref()).await?;
    let provider = CloudTtsProvider::new(&config).await?;

    let facade = SynthesisFacade::new(Arc::new(registry), Arc::new(provider))
        .with_timeout(config.request_timeout());
    let app = router(Arc::new(AppState::new(facade)));

    HttpServerBuilder::new(app)
        .with_bind_addr(config.bind_addr())
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
