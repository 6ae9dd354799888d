use clap::Parser;
use common::config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use orders::{
    notify::NotificationSender, payment::PaymentProvider, repository::AddressRepository,
    repository::OrderRepository, repository::ProductRepository, service::OrderService,
};
use std::error::Error;
use std::sync::Arc;
use store::{
    api::{build_router, initialize_tracing, AppState},
    notify::{LogNotifier, MailApiNotifier},
    order_store::SeaOrmStore,
    payment::RestPaymentProvider,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "store/config/dev.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    initialize_tracing(&config.server.log_level);
    tracing::info!(project = %config.common.project_name, "Starting storefront server");

    PrometheusBuilder::new().install()?;

    let store = Arc::new(SeaOrmStore::new(&config.common.database_url).await?);
    let payments: Arc<dyn PaymentProvider> =
        Arc::new(RestPaymentProvider::new(config.payment.clone()));
    let notifier: Arc<dyn NotificationSender> = if config.notifications.enabled {
        Arc::new(MailApiNotifier::new(config.notifications.clone()))
    } else {
        Arc::new(LogNotifier)
    };

    let service = Arc::new(OrderService::new(
        store.clone() as Arc<dyn OrderRepository>,
        store.clone() as Arc<dyn ProductRepository>,
        store.clone() as Arc<dyn AddressRepository>,
        payments,
        notifier,
    ));

    let app = build_router(AppState::new(service));

    tracing::info!("Listening on {}", config.server.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
