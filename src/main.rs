use std::sync::Arc;

use initserver::config::{Options, ProcessEnv, DEFAULT_CONFIG_PATH};
use initserver::logger::{TracingSink, WriterSink};
use initserver::{initialise_server_with, Handler, Sink};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("initserver=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let options = Options::load_from(&config_path)?;

    // Log files replace tracing output entirely when configured
    let sink: Arc<dyn Sink> = if options.access_log.is_some() || options.error_log.is_some() {
        Arc::new(WriterSink::new(
            options.access_log.as_deref(),
            options.error_log.as_deref(),
        )?)
    } else {
        Arc::new(TracingSink)
    };

    let health = Handler::from_fn("healthz", |req, res, next| {
        if req.path() == "/healthz" {
            res.send_text("ok");
        } else {
            next.advance();
        }
    });

    let server = initialise_server_with((options, health), &ProcessEnv, sink).await?;
    tracing::info!("Listening on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down");
    server.shutdown().await;
    Ok(())
}
