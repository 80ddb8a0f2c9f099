use std::sync::Arc;

use envconfig::Envconfig;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crud_kit::backend::{CacheBackend, InMemoryBackend, RedisBackend, RedisConfig};
use crud_kit::config::Config;
use crud_kit::http::{router, setup_metrics_recorder, AppState};
use crud_kit::models::{Product, User};
use crud_kit::observability::PrometheusMetrics;
use crud_kit::repository::{postgres, PgStore};
use crud_kit::{auth::TokenIssuer, CacheGateway, Dispatcher, ProductService, UserService};

async fn shutdown() {
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => {},
        _ = signal::ctrl_c() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

fn cache_backend(config: &Config) -> crud_kit::Result<Arc<dyn CacheBackend>> {
    if !config.uses_redis() {
        tracing::info!("REDIS_URL is empty, using the in-process cache");
        return Ok(Arc::new(InMemoryBackend::new()));
    }

    let backend = RedisBackend::new(RedisConfig {
        url: config.redis_url.clone(),
        pool_size: config.redis_pool_size,
        connection_timeout: config.operation_timeout(),
    })?;
    Ok(Arc::new(backend))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::init_from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let prometheus = setup_metrics_recorder()?;

    let pool = postgres::connect(&config.database_url, config.max_pg_connections).await?;
    if config.run_migrations {
        postgres::run_migrations(&pool).await?;
    }

    let gateway = CacheGateway::new(cache_backend(&config)?)
        .with_metrics(Arc::new(PrometheusMetrics))
        .with_ttl_policy(config.ttl_policy())
        .with_timeout(config.operation_timeout());

    if !gateway.health_check().await {
        tracing::warn!("cache backend unreachable at startup, reads will fall through to the store");
    }

    let user_store = Arc::new(PgStore::<User>::new(pool.clone()));
    let users = UserService::new(
        Dispatcher::new(user_store.clone(), gateway.clone())
            .with_timeout(config.operation_timeout()),
        user_store,
        TokenIssuer::new(&config.jwt_secret, config.token_ttl()),
    )
    .with_timeout(config.operation_timeout());

    let products: ProductService =
        Dispatcher::for_products(Arc::new(PgStore::<Product>::new(pool)), gateway)
            .with_timeout(config.operation_timeout());

    let app = router(AppState {
        users: Arc::new(users),
        products: Arc::new(products),
        prometheus,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("listening on {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;

    Ok(())
}
