//! Application state management

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{PasswordHasher, TokenService},
    config::Config,
    database,
    error::Result,
    models::{Motorcycle, Portal, User},
    repository::Gateway,
};

/// Application state shared across handlers
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    motorcycles: Gateway<Motorcycle>,
    portals: Gateway<Portal>,
    users: Gateway<User>,
    tokens: TokenService,
    passwords: Arc<PasswordHasher>,
}

impl AppState {
    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// State backed by the in-memory gateways
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::assemble(config, None)
    }

    fn assemble(config: Config, pool: Option<PgPool>) -> Result<Self> {
        let tokens = TokenService::new(&config.jwt)?;
        let passwords = Arc::new(PasswordHasher::new(&config.password));

        let (motorcycles, portals, users) = match pool {
            Some(pool) => (
                Gateway::postgres(pool.clone()),
                Gateway::postgres(pool.clone()),
                Gateway::postgres(pool),
            ),
            None => (Gateway::memory(), Gateway::memory(), Gateway::memory()),
        };

        Ok(Self {
            config: Arc::new(config),
            motorcycles,
            portals,
            users,
            tokens,
            passwords,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn motorcycles(&self) -> &Gateway<Motorcycle> {
        &self.motorcycles
    }

    pub fn portals(&self) -> &Gateway<Portal> {
        &self.portals
    }

    pub fn users(&self) -> &Gateway<User> {
        &self.users
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }
}

/// Builder for AppState
///
/// Chooses the persistence backend: an explicit pool wins, then the
/// `database` section of the configuration, otherwise process memory.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    pool: Option<PgPool>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing PostgreSQL pool
    pub fn db_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the AppState, connecting to the database when configured
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let pool = match (self.pool, config.database.as_ref()) {
            (Some(pool), _) => Some(pool),
            (None, Some(db_config)) => {
                let pool = database::create_pool(db_config).await?;
                if db_config.bootstrap_schema {
                    database::bootstrap_schema(&pool).await?;
                }
                Some(pool)
            }
            (None, None) => {
                tracing::info!("No database configured, using in-memory storage");
                None
            }
        };

        AppState::assemble(config, pool)
    }
}
