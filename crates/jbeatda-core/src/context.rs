use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::{ApiClient, HttpStampService, HttpUserService};
use crate::auth::SessionState;
use crate::config::Config;
use crate::repository::{AccountRepository, StampRepository};
use crate::store::SettingsStore;

/// Process-wide singletons, built once at startup and shared by reference.
///
/// Owns the only `SettingsStore` and the only `ApiClient`; everything else
/// is wired on top of those two.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SettingsStore>,
    pub session: SessionState,
    pub client: ApiClient,
    pub account: Arc<AccountRepository<HttpUserService>>,
    pub stamps: Arc<StampRepository<HttpStampService>>,
}

impl AppContext {
    pub fn build(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = Arc::new(
            SettingsStore::open(&data_dir)
                .with_context(|| format!("Failed to open settings in {}", data_dir.display()))?,
        );

        let session = SessionState::new(Arc::clone(&store), config.session_keys());
        let client = ApiClient::new(&config.client_config()?, session.clone())
            .context("Failed to build HTTP client")?;

        let account = Arc::new(AccountRepository::new(
            HttpUserService::new(client.clone()),
            session.clone(),
            Arc::clone(&store),
        ));
        let stamps = Arc::new(StampRepository::new(
            HttpStampService::new(client.clone()),
            Arc::clone(&store),
        ));

        info!(data_dir = ?data_dir, "Application context ready");
        Ok(Self {
            config,
            store,
            session,
            client,
            account,
            stamps,
        })
    }
}
