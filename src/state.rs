use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::auth::TokenProvider;
use crate::config::Ga4Config;
use crate::ga4::client::Ga4Client;

#[derive(Clone)]
pub struct AppState {
    pub config: Ga4Config,
    pub http: reqwest::Client,
    pub ga4: Arc<Ga4Client>,
}

impl AppState {
    pub fn new(config: Ga4Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .context("failed to build HTTP client")?;
        let auth = Arc::new(TokenProvider::new(
            config.credentials.clone(),
            config.oauth_scopes.clone(),
        ));
        let ga4 = Arc::new(Ga4Client::new(http.clone(), &config.api_base_url, auth));
        Ok(Self { config, http, ga4 })
    }
}
