use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::KeepAliveConfig;

/// Environment lookup used to discover the base URL.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads the real process environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|key| std::env::var(key).ok())
}

/// Resolves and caches the base URL the keep-alive pings.
///
/// Order: explicit config value, `{app_url_var}`, then `https://{public_domain_var}`.
/// The explicit value and `{app_url_var}` are read at construction; the
/// domain fallback is only consulted on [`resolve`](Self::resolve). The first
/// non-empty result is cached for the life of the resolver; while nothing is
/// found the environment is re-read on every call.
pub struct TargetResolver {
    app_url_var: String,
    public_domain_var: String,
    lookup: EnvLookup,
    cached: RwLock<Option<String>>,
}

impl TargetResolver {
    pub fn new(cfg: &KeepAliveConfig, lookup: EnvLookup) -> Self {
        let seeded = cfg
            .app_url
            .as_deref()
            .and_then(normalize)
            .or_else(|| lookup(&cfg.app_url_var).as_deref().and_then(normalize));
        Self {
            app_url_var: cfg.app_url_var.clone(),
            public_domain_var: cfg.public_domain_var.clone(),
            lookup,
            cached: RwLock::new(seeded),
        }
    }

    /// Base URL without a trailing slash, or `None` if nothing is configured yet.
    pub fn resolve(&self) -> Option<String> {
        if let Some(url) = self.current() {
            return Some(url);
        }

        let found = self.discover()?;
        debug!(url = %found, "keep-alive target resolved");
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        Some(cached.get_or_insert(found).clone())
    }

    /// Cached base URL, without consulting the environment.
    pub fn current(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn app_url_var(&self) -> &str {
        &self.app_url_var
    }

    pub fn public_domain_var(&self) -> &str {
        &self.public_domain_var
    }

    fn discover(&self) -> Option<String> {
        if let Some(url) = (self.lookup)(&self.app_url_var).as_deref().and_then(normalize) {
            return Some(url);
        }

        let domain = (self.lookup)(&self.public_domain_var)?;
        let domain = domain.trim();
        if domain.is_empty() {
            return None;
        }
        if domain.contains("://") {
            normalize(domain)
        } else {
            normalize(&format!("https://{domain}"))
        }
    }
}

fn normalize(raw: &str) -> Option<String> {
    let url = raw.trim().trim_end_matches('/');
    (!url.is_empty()).then(|| url.to_string())
}
