use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_webhooks::config::Config;
use loyalty_webhooks::handlers;
use loyalty_webhooks::shopify::ShopifyClient;
use loyalty_webhooks::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "loyalty-webhooks")]
#[command(about = "Shopify webhook receiver for loyalty points and referral rewards")]
struct Cli {
    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Print the resolved configuration (secrets redacted) and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty_webhooks=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    if let Some(port) = cli.port {
        config.port = port;
    }

    if cli.print_config {
        println!("{}", config.redacted());
        return;
    }

    let client = ShopifyClient::new(&config.shopify).unwrap_or_else(|e| {
        eprintln!("Failed to build Shopify client: {}", e);
        std::process::exit(1);
    });

    if config.webhook_secret.is_none() {
        tracing::warn!("SHOPIFY_WEBHOOK_SECRET is not set: webhook signatures will NOT be verified");
    }

    let state = AppState::new(
        Arc::new(client),
        config.webhook_secret.clone(),
        config.lookup_mode,
    );

    let app = handlers::router(Some(config.rate_limit_referral_rpm))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(
        "Loyalty webhooks listening on {} (store {}, lookup mode {})",
        addr,
        config.shopify.store,
        config.lookup_mode.as_str()
    );

    // Connect info is required by the per-IP rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
