//! # Backend Resolution
//!
//! Finds a live server among a list of candidate ports and remembers it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve()                                                              │
//! │     │                                                                   │
//! │     ├── cached and younger than TTL? ──► return cached base URL         │
//! │     │                                                                   │
//! │     └── for port in ports:                                              │
//! │            GET {host}:{port}/api/health   (bounded by probe_timeout)    │
//! │            2xx ──► cache + return                                       │
//! │         none healthy ──► ClientError::Unreachable                       │
//! │                                                                         │
//! │  invalidate() ── drop the cached URL (called after transport errors)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Clones share one cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Default host probed when none is configured.
pub const DEFAULT_HOST: &str = "http://localhost";

/// Ports probed, in order, when none are configured.
pub const DEFAULT_PORTS: &[u16] = &[5000, 5001, 5002, 5003];

/// Path of the health endpoint used as the liveness probe.
pub const HEALTH_PATH: &str = "/api/health";

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Scheme and host, without a port (e.g. `http://localhost`).
    pub host: String,
    pub ports: Vec<u16>,
    /// Upper bound for each health probe.
    pub probe_timeout: Duration,
    /// How long a resolved URL is trusted before re-probing.
    pub ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            host: DEFAULT_HOST.to_string(),
            ports: DEFAULT_PORTS.to_vec(),
            probe_timeout: Duration::from_secs(2),
            ttl: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    pub fn new(host: impl Into<String>, ports: Vec<u16>) -> Self {
        ResolverConfig {
            host: host.into().trim_end_matches('/').to_string(),
            ports,
            ..Default::default()
        }
    }

    fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        self.ports.iter().map(move |port| format!("{}:{}", self.host, port))
    }
}

#[derive(Debug, Clone)]
struct CachedBackend {
    base_url: String,
    resolved_at: Instant,
}

/// Locates a reachable backend and caches it for `ttl`.
#[derive(Debug, Clone)]
pub struct BackendResolver {
    config: Arc<ResolverConfig>,
    http: reqwest::Client,
    cached: Arc<RwLock<Option<CachedBackend>>>,
}

impl BackendResolver {
    pub fn new(config: ResolverConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .build()?;

        Ok(BackendResolver {
            config: Arc::new(config),
            http,
            cached: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the base URL of a healthy backend.
    ///
    /// ## Errors
    /// `ClientError::Unreachable` when no candidate answers the probe.
    pub async fn resolve(&self) -> ClientResult<String> {
        if let Some(base_url) = self.current().await {
            return Ok(base_url);
        }

        for base_url in self.config.candidates() {
            if self.probe(&base_url).await {
                info!(%base_url, "Backend resolved");
                *self.cached.write().await = Some(CachedBackend {
                    base_url: base_url.clone(),
                    resolved_at: Instant::now(),
                });
                return Ok(base_url);
            }
        }

        Err(ClientError::Unreachable(format!(
            "no healthy backend at {} on ports {:?}",
            self.config.host, self.config.ports
        )))
    }

    /// The cached URL, if still within its TTL.
    pub async fn current(&self) -> Option<String> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|c| c.resolved_at.elapsed() < self.config.ttl)
            .map(|c| c.base_url.clone())
    }

    /// Forgets the cached URL so the next call re-probes.
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            debug!("Backend cache invalidated");
        }
    }

    async fn probe(&self, base_url: &str) -> bool {
        let url = format!("{}{}", base_url, HEALTH_PATH);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{spawn_server, unused_port};

    #[test]
    fn test_config_trims_host() {
        let config = ResolverConfig::new("http://127.0.0.1/", vec![1, 2]);
        let urls: Vec<String> = config.candidates().collect();
        assert_eq!(urls, vec!["http://127.0.0.1:1", "http://127.0.0.1:2"]);
    }

    #[tokio::test]
    async fn test_resolve_skips_dead_ports() {
        let (port, _server) = spawn_server().await;
        let dead = unused_port().await;

        let resolver =
            BackendResolver::new(ResolverConfig::new("http://127.0.0.1", vec![dead, port])).unwrap();
        let url = resolver.resolve().await.unwrap();
        assert_eq!(url, format!("http://127.0.0.1:{}", port));

        // Shared with clones.
        let clone = resolver.clone();
        assert_eq!(clone.current().await, Some(url));

        clone.invalidate().await;
        assert_eq!(resolver.current().await, None);
    }

    #[tokio::test]
    async fn test_resolve_nothing_listening() {
        let dead = unused_port().await;
        let resolver =
            BackendResolver::new(ResolverConfig::new("http://127.0.0.1", vec![dead])).unwrap();

        let err = resolver.resolve().await.unwrap_err();
        assert!(err.is_offline());
    }

    #[tokio::test]
    async fn test_expired_entry_is_ignored() {
        let (port, _server) = spawn_server().await;
        let mut config = ResolverConfig::new("http://127.0.0.1", vec![port]);
        config.ttl = Duration::ZERO;

        let resolver = BackendResolver::new(config).unwrap();
        resolver.resolve().await.unwrap();
        assert_eq!(resolver.current().await, None);
    }
}
