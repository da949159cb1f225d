use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use writing_proxy::config::{config_search_paths, load_dotenv};
use writing_proxy::providers::available_providers;
use writing_proxy::{build_router, AppState, ProxyConfig, SharedLogger};

#[derive(Parser)]
#[command(
    name = "writing-proxy",
    about = "Provider-routing proxy for a writing assistant: OpenAI, Anthropic and Gemini behind one endpoint",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Journal file path
    #[arg(long, default_value = "writing-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Loaded before the subscriber so RUST_LOG may come from .env.
    let dotenv = load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "writing_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), "Loaded .env"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring .env"),
    }

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let logger = SharedLogger::new(&cli.log_file)?;
    let availability = available_providers(&config.keys);

    info!("writing-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Server keys: openai={} anthropic={} gemini={}",
        availability.openai, availability.anthropic, availability.gemini
    );
    info!("  CORS origin: {}", config.cors_origin());
    info!(
        "  Anthropic:   {}",
        if config.anthropic_passthrough { "passthrough" } else { "normalized" }
    );
    info!("  Port:        {}", config.port);
    info!("  Log file:    {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting writing-proxy port={} origin={}",
            config.port,
            config.cors_origin()
        ),
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config, logger)?);

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
