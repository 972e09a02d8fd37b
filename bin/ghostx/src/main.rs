//! # GhostX Binary
//!
//! Assembles the application from the plugins enabled at compile time.
//! Without `db-sqlite` everything lives in memory; without `auth-mock`
//! login is refused.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use gx_api::middleware::{cors_policy, security_headers, standard_middleware};
use gx_api::{configure_routes, AppState, FeedDefaults};
use gx_config::AppConfig;
use gx_core::{IdentityProvider, KvBackend};
use gx_valuation::MockFinancialData;

#[cfg(feature = "db-sqlite")]
use gx_db_sqlite::SqliteKvBackend;

#[cfg(feature = "auth-mock")]
use gx_auth_mock::MockIdentityProvider;

#[cfg(feature = "db-sqlite")]
async fn backend(config: &AppConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    Ok(Arc::new(SqliteKvBackend::new(&config.database.url).await?))
}

#[cfg(not(feature = "db-sqlite"))]
async fn backend(_config: &AppConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    log::warn!("db-sqlite disabled, annotations will not survive a restart");
    Ok(Arc::new(gx_core::MemoryBackend::new()))
}

#[cfg(feature = "auth-mock")]
fn identity_provider() -> Arc<dyn IdentityProvider> {
    Arc::new(MockIdentityProvider::new())
}

#[cfg(not(feature = "auth-mock"))]
fn identity_provider() -> Arc<dyn IdentityProvider> {
    Arc::new(NoIdentityProvider)
}

/// Stand-in when no identity plugin is compiled in.
#[cfg(not(feature = "auth-mock"))]
struct NoIdentityProvider;

#[cfg(not(feature = "auth-mock"))]
#[async_trait::async_trait]
impl IdentityProvider for NoIdentityProvider {
    async fn login(&self) -> anyhow::Result<gx_core::Identity> {
        anyhow::bail!("no identity provider compiled in")
    }

    fn generate_invite_code(&self) -> String {
        format!("{:06}", chrono::Utc::now().timestamp_subsec_micros() % 1_000_000)
    }

    async fn resolve_invite(&self, invite_code: &str) -> anyhow::Result<gx_core::Group> {
        anyhow::bail!("cannot resolve invite {invite_code} without an identity provider")
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let state = web::Data::new(
        AppState::new(
            backend(&config).await?,
            identity_provider(),
            Arc::new(MockFinancialData),
            FeedDefaults {
                summary_window_hours: config.feed.summary_window_hours,
                merged_feed_limit: config.feed.merged_feed_limit,
            },
        )
        .await,
    );

    let (host, port) = config.bind_address();
    log::info!("GhostX starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(security_headers())
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
