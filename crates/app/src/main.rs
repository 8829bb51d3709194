use std::net::SocketAddr;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dompet={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] section in settings, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = connect_database(&server.database).await?;
    let engine = engine::Engine::builder()
        .store(engine::SqlStore::new(db.clone()))
        .build()?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, db, listener).await?;

    Ok(())
}

async fn connect_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
