use std::{sync::Arc, time::Duration};

use engine::{BothSplit, Engine};
use gateway::HttpGateway;
use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::time::MissedTickBehavior;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ridepay={level},server={level},engine={level},gateway={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let mut builder = Engine::builder()
        .database(db)
        .both_split(BothSplit::new(settings.ledger.both_credit_deposit_percent)?);
    match &settings.gateway {
        Some(gateway) => {
            tracing::info!("Found gateway settings...");
            builder = builder.gateway(Arc::new(HttpGateway::new(gateway.to_config())?));
        }
        None => tracing::warn!("no gateway settings, wallet funding is disabled"),
    }
    let engine = Arc::new(builder.build().await?);

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server_engine = engine.clone();
    tasks.spawn(async move {
        if let Err(err) = server::run_with_listener(server_engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    match (&settings.gateway, settings.reconciler) {
        (Some(_), Some(reconciler)) => {
            tracing::info!("Found reconciler settings...");
            let stale_after = chrono::Duration::try_seconds(
                i64::try_from(reconciler.stale_after_secs).unwrap_or(i64::MAX / 1000),
            )
            .ok_or("reconciler.stale_after_secs is out of range")?;
            let every = Duration::from_secs(reconciler.interval_secs.max(1));
            tasks.spawn(run_reconciler(engine, every, stale_after));
        }
        (None, Some(_)) => tracing::warn!("reconciler configured without a gateway, skipping"),
        _ => {}
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// Periodically verifies funding payments whose webhook never arrived.
async fn run_reconciler(engine: Arc<Engine>, every: Duration, stale_after: chrono::Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(err) = engine.reconcile_stale_pending(stale_after).await {
            tracing::error!("reconciliation sweep failed: {err}");
        }
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let options = match config {
        // every pooled connection would open its own empty in-memory database
        Database::Memory => {
            let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
            options.max_connections(1).min_connections(1);
            options
        }
        Database::Sqlite(path) => sea_orm::ConnectOptions::new(format!("sqlite:{}?mode=rwc", path)),
    };

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
