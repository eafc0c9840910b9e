use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mercato_core::{MarketAdapter, MercatoConfig, MercatoError, PriorityTable, Validator};
use mercato_middleware::CacheManager;

/// Orchestrator that fans aggregate requests out across registered adapters.
pub struct Mercato {
    pub(crate) adapters: Vec<Arc<dyn MarketAdapter>>,
    pub(crate) cfg: MercatoConfig,
    pub(crate) priority: PriorityTable,
    pub(crate) validator: Validator,
    pub(crate) cache: Arc<CacheManager>,
}

impl std::fmt::Debug for Mercato {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mercato")
            .field("adapters", &self.adapters.len())
            .field("cfg", &self.cfg)
            .field("priority", &self.priority)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a `Mercato` orchestrator with custom configuration.
pub struct MercatoBuilder {
    adapters: Vec<Arc<dyn MarketAdapter>>,
    cfg: MercatoConfig,
    validator: Option<Validator>,
    cache: Option<Arc<CacheManager>>,
}

impl Default for MercatoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MercatoBuilder {
    /// Create a new builder with default configuration.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no adapters; register at least one via [`with_adapter`].
    /// - Each orchestrator gets its own in-memory cache unless one is supplied
    ///   through [`cache`]; nothing is shared process-wide.
    ///
    /// [`with_adapter`]: Self::with_adapter
    /// [`cache`]: Self::cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: vec![],
            cfg: MercatoConfig::default(),
            validator: None,
            cache: None,
        }
    }

    /// Register a provider adapter.
    ///
    /// Behavior and trade-offs:
    /// - Registration order is the dedupe priority when no explicit priority
    ///   is configured.
    /// - Adapter names must be unique; `build` rejects duplicates because
    ///   statuses, cursors and cache keys are keyed by name.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn MarketAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: MercatoConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the dedupe priority using adapter instances, highest priority first.
    ///
    /// Behavior and trade-offs:
    /// - Unlisted adapters rank after every listed one and tie with each other,
    ///   so the first snapshot seen wins among them.
    /// - Type-safe alternative to editing `MercatoConfig::dedupe_priority` by name.
    #[must_use]
    pub fn dedupe_priority(mut self, adapters_desc: &[Arc<dyn MarketAdapter>]) -> Self {
        self.cfg.dedupe_priority = adapters_desc
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        self
    }

    /// Set the per-unit timeout applied to every (provider, category) unit.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Set an overall deadline for each aggregate call.
    ///
    /// Behavior and trade-offs:
    /// - Units still running when the deadline passes are abandoned and their
    ///   providers reported as failed; finished units keep their data.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Default concurrency for requests that do not ask for one.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.cfg.max_concurrency = n;
        self
    }

    /// Replace the validator used to filter snapshots.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Use a caller-supplied cache for responses and provider health.
    #[must_use]
    pub fn cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the `Mercato` orchestrator.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no adapters are registered, two adapters share a
    /// name, or the concurrency and page-size limits are inconsistent.
    pub fn build(mut self) -> Result<Mercato, MercatoError> {
        if self.adapters.is_empty() {
            return Err(MercatoError::InvalidArg(
                "no adapters registered; add at least one via with_adapter(...)".to_string(),
            ));
        }

        let mut names: HashSet<&'static str> = HashSet::new();
        for a in &self.adapters {
            if !names.insert(a.name()) {
                return Err(MercatoError::InvalidArg(format!(
                    "adapter name '{}' registered twice",
                    a.name()
                )));
            }
        }

        let cfg = &self.cfg;
        if cfg.hard_max_concurrency == 0
            || cfg.hard_max_concurrency > MercatoConfig::CONCURRENCY_LIMIT
        {
            return Err(MercatoError::InvalidArg(format!(
                "hard_max_concurrency must be within 1..={}, got {}",
                MercatoConfig::CONCURRENCY_LIMIT,
                cfg.hard_max_concurrency
            )));
        }
        if cfg.max_concurrency == 0
            || cfg.max_concurrency > cfg.hard_max_concurrency
        {
            return Err(MercatoError::InvalidArg(format!(
                "max_concurrency must be within 1..={}, got {}",
                cfg.hard_max_concurrency, cfg.max_concurrency
            )));
        }
        if cfg.max_page_size == 0
            || cfg.default_page_size == 0
            || cfg.default_page_size > cfg.max_page_size
        {
            return Err(MercatoError::InvalidArg(format!(
                "default_page_size must be within 1..={}, got {}",
                cfg.max_page_size, cfg.default_page_size
            )));
        }

        // Drop unknown and repeated names from the priority list.
        let mut seen: HashSet<&str> = HashSet::new();
        let filtered: Vec<String> = self
            .cfg
            .dedupe_priority
            .iter()
            .filter(|n| names.contains(n.as_str()) && seen.insert(n.as_str()))
            .cloned()
            .collect();
        self.cfg.dedupe_priority = filtered;

        let priority = if self.cfg.dedupe_priority.is_empty() {
            PriorityTable::new(self.adapters.iter().map(|a| a.name()))
        } else {
            PriorityTable::new(self.cfg.dedupe_priority.iter().cloned())
        };

        Ok(Mercato {
            adapters: self.adapters,
            cfg: self.cfg,
            priority,
            validator: self.validator.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
        })
    }
}

/// Attach the adapter name to errors that do not already carry one.
pub(crate) fn tag_err(connector: &str, e: MercatoError) -> MercatoError {
    match e {
        e @ (MercatoError::NotFound { .. }
        | MercatoError::ProviderTimeout { .. }
        | MercatoError::RequestTimeout { .. }
        | MercatoError::Connector { .. }
        | MercatoError::Transport { .. }
        | MercatoError::RetriesExhausted { .. }) => e,
        other => MercatoError::Connector {
            connector: connector.to_string(),
            msg: other.to_string(),
        },
    }
}

impl Mercato {
    /// Wrap a provider future with a timeout and standardized timeout error mapping.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "mercato::core::provider_call_with_timeout",
            skip(fut),
            fields(
                connector = connector_name,
                capability = capability,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        connector_name: &'static str,
        capability: &'static str,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, MercatoError>
    where
        Fut: core::future::Future<Output = Result<T, MercatoError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(MercatoError::provider_timeout(connector_name, capability)))
    }

    /// Start building a new `Mercato` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use mercato_mock::MockAdapter;
    ///
    /// let primary: Arc<dyn mercato::MarketAdapter> = Arc::new(MockAdapter::new().named("primary"));
    /// let backup: Arc<dyn mercato::MarketAdapter> = Arc::new(MockAdapter::new().named("backup"));
    ///
    /// let mercato = mercato::Mercato::builder()
    ///     .with_adapter(backup.clone())
    ///     .with_adapter(primary.clone())
    ///     .dedupe_priority(&[primary, backup])
    ///     .provider_timeout(std::time::Duration::from_secs(20))
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> MercatoBuilder {
        MercatoBuilder::new()
    }

    /// Names of the registered adapters, in registration order.
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Effective configuration after `build` normalized it.
    #[must_use]
    pub const fn config(&self) -> &MercatoConfig {
        &self.cfg
    }

    /// Cache shared by responses and provider health.
    #[must_use]
    pub const fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub(crate) fn adapter(&self, name: &str) -> Option<&Arc<dyn MarketAdapter>> {
        self.adapters.iter().find(|a| a.name() == name)
    }
}
