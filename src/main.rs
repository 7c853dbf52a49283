//! Authflow server binary

use authflow::{
    create_routes, AuthConfig, AuthError, AuthService, MemoryStore, PgStore, RefreshTokenStore,
    ServerConfig, StoreBackend, UserStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

type Stores = (Arc<dyn UserStore>, Arc<dyn RefreshTokenStore>);

/// One backend serves both store roles
fn shared<S>(store: Arc<S>) -> Stores
where
    S: UserStore + RefreshTokenStore + 'static,
{
    let users: Arc<dyn UserStore> = store.clone();
    let refresh_tokens: Arc<dyn RefreshTokenStore> = store;
    (users, refresh_tokens)
}

async fn open_stores(server: &ServerConfig) -> Result<Stores, AuthError> {
    match server.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(shared(Arc::new(MemoryStore::new())))
        }
        StoreBackend::Postgres => {
            let url = server
                .database_url
                .as_deref()
                .ok_or_else(|| AuthError::Config("DATABASE_URL is not set".into()))?;
            let store = Arc::new(PgStore::connect(url).await?);
            store.migrate().await?;
            Ok(shared(store))
        }
        #[cfg(feature = "mongo")]
        StoreBackend::Mongo => {
            let uri = server
                .mongo_uri
                .as_deref()
                .ok_or_else(|| AuthError::Config("MONGO_URI is not set".into()))?;
            let store = Arc::new(authflow::MongoStore::connect(uri, &server.mongo_db_name).await?);
            store.ensure_indexes().await?;
            Ok(shared(store))
        }
        #[cfg(not(feature = "mongo"))]
        StoreBackend::Mongo => Err(AuthError::Config(
            "mongo backend requires building with the `mongo` feature".into(),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("authflow=info,tower_http=info")),
        )
        .init();

    let server = ServerConfig::from_env()?;
    let config = AuthConfig::from_env()?;

    let (users, refresh_tokens) = open_stores(&server).await?;
    let auth = Arc::new(AuthService::new(users, refresh_tokens, config)?);

    let app = create_routes(auth);

    let listener = TcpListener::bind(&server.bind_addr).await?;
    tracing::info!(addr = %server.bind_addr, backend = ?server.backend, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
