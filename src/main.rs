use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern::{
    api,
    config::{MediaProvider, Settings},
    database::DatabaseManager,
    media::{CloudinaryStore, LocalMediaStore, MediaStore},
    payments::{PaymentGateway, RazorpayClient},
    service::{CheckoutService, ServiceContext},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting Lectern server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let database = DatabaseManager::connect(&settings.database).await?;
    database.migrate().await?;

    // Media store
    let media_store: Arc<dyn MediaStore> = match (settings.media.provider, settings.media.cloudinary.clone()) {
        (MediaProvider::Cloudinary, Some(cloudinary)) => {
            tracing::info!("Media uploads go to Cloudinary");
            Arc::new(CloudinaryStore::new(cloudinary)?)
        }
        (MediaProvider::Cloudinary, None) => {
            tracing::warn!("Cloudinary selected but not configured, storing uploads locally");
            Arc::new(LocalMediaStore::new(&settings.media.uploads_dir, &settings.server.base_url))
        }
        (MediaProvider::Local, _) => {
            tracing::info!("Media uploads stored in {}", settings.media.uploads_dir);
            Arc::new(LocalMediaStore::new(&settings.media.uploads_dir, &settings.server.base_url))
        }
    };

    // Create service context
    let service_context = Arc::new(ServiceContext::new(database.clone(), &settings, media_store));

    match service_context.auth_service.cleanup_expired_sessions().await {
        Ok(removed) if removed > 0 => tracing::info!("Removed {} expired sessions", removed),
        Ok(_) => {}
        Err(e) => tracing::warn!("Expired session cleanup failed: {}", e),
    }

    // Initialize Razorpay client if configured
    let checkout_service = match settings.razorpay_credentials() {
        Some((key_id, key_secret)) => {
            tracing::info!("Razorpay payment processing enabled");
            let gateway: Arc<dyn PaymentGateway> =
                Arc::new(RazorpayClient::new(&settings.razorpay, key_id, key_secret)?);
            Some(Arc::new(CheckoutService::new(
                service_context.course_repo.clone(),
                service_context.purchase_repo.clone(),
                service_context.user_repo.clone(),
                gateway,
                &settings.razorpay.currency,
            )?))
        }
        None if settings.razorpay.enabled => {
            tracing::warn!("Razorpay enabled but missing key_id or key_secret");
            None
        }
        None => {
            tracing::info!("Razorpay payment processing disabled");
            None
        }
    };

    let app = api::create_app(service_context, checkout_service, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
