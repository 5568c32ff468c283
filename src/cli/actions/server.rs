use crate::{
    api::{self, AppState},
    auth::{AuthConfig, AuthService},
    cli::{
        commands::{auth, broker, storage},
        telemetry,
    },
    events::{EventPublisher, LogEventPublisher, amqp::AmqpEventPublisher},
    management::ProfileService,
    storage::{
        ACTIVATION_PREFIX, CredentialStore, ProfileStore, SESSION_PREFIX, TokenStore,
        memory::{MemoryTokenStore, MemoryUserStore},
        postgres::{self, PgUserStore},
        redis::{self, RedisTokenStore},
    },
};
use anyhow::{Context, Result, anyhow};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub storage: storage::Options,
    pub broker: broker::Options,
    pub auth: auth::Options,
}

struct Backends {
    users: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn TokenStore>,
    activations: Arc<dyn TokenStore>,
    events: Arc<dyn EventPublisher>,
}

async fn postgres_backends(
    dsn: &secrecy::SecretString,
    redis_url: &secrecy::SecretString,
    migrate: bool,
    broker: &broker::Options,
) -> Result<Backends> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    if migrate {
        postgres::migrate(&pool).await?;
        info!("database migrations applied");
    }

    let users = Arc::new(PgUserStore::new(pool));

    let connection = redis::connect(redis_url.expose_secret()).await?;

    let amqp_url = broker
        .url
        .as_ref()
        .ok_or_else(|| anyhow!("missing required argument: --amqp-url"))?;
    let events = AmqpEventPublisher::connect(amqp_url, &broker.exchange)
        .await
        .context("Failed to connect to message broker")?;

    Ok(Backends {
        users: users.clone(),
        profiles: users,
        sessions: Arc::new(RedisTokenStore::new(connection.clone(), SESSION_PREFIX)),
        activations: Arc::new(RedisTokenStore::new(connection, ACTIVATION_PREFIX)),
        events: Arc::new(events),
    })
}

fn memory_backends() -> Backends {
    warn!("using in-memory storage, all state is lost on exit");

    let users = Arc::new(MemoryUserStore::new());

    Backends {
        users: users.clone(),
        profiles: users,
        sessions: Arc::new(MemoryTokenStore::new()),
        activations: Arc::new(MemoryTokenStore::new()),
        events: Arc::new(LogEventPublisher),
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if a backend is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {:?}", args);

    let backends = match &args.storage {
        storage::Options::Postgres {
            dsn,
            redis_url,
            migrate,
        } => postgres_backends(dsn, redis_url, *migrate, &args.broker).await?,
        storage::Options::Memory => memory_backends(),
    };

    let config = AuthConfig::new()
        .with_session_ttl_seconds(args.auth.session_ttl_seconds)
        .with_activation_ttl_seconds(args.auth.activation_ttl_seconds)
        .with_bcrypt_cost(args.auth.bcrypt_cost);

    let auth = AuthService::new(
        backends.users,
        backends.sessions,
        backends.activations,
        backends.events,
        config,
    );
    let profiles = ProfileService::new(backends.profiles);

    let state = Arc::new(
        AppState::new(auth, profiles)
            .with_request_timeout_seconds(args.auth.request_timeout_seconds),
    );

    let result = api::serve(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}
