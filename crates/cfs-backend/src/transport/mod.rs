//! A shared, connection-pooled HTTP client used by every `http(s)://` and
//! `cfs://` backend.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::Result;

static GLOBAL_HTTP_CLIENT: OnceLock<Arc<Client>> = OnceLock::new();

/// Cloneable handle to the process-wide HTTP client.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Get (creating on first call) the shared, default-configured client.
    pub fn new() -> Result<Self> {
        // rustls needs an explicit default crypto provider installed once per
        // process; ignore the error if a caller already installed one.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = GLOBAL_HTTP_CLIENT.get_or_init(|| {
            Arc::new(
                Self::build(&HttpConfig::default()).unwrap_or_else(|_| Client::new()),
            )
        });
        Ok(Self {
            client: Arc::clone(client),
        })
    }

    /// Build a standalone client with a custom [`HttpConfig`], bypassing the
    /// process-wide shared instance.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Self::build(config)?),
        })
    }

    fn build(config: &HttpConfig) -> Result<Client> {
        ClientBuilder::new()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            .http2_adaptive_window(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("cfs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Into::into)
    }

    /// The underlying `reqwest::Client`, for callers that need raw request
    /// building.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new().expect("default reqwest client builder never fails")
    }
}

/// Tunable connection-pool and timeout parameters for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Idle connection lifetime before the pool closes it.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections kept open per host.
    pub pool_max_idle_per_host: usize,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
            timeout: Duration::from_secs(45),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
