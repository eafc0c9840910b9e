use std::collections::BTreeMap;

use mercato_core::{ProviderStatus, StatusKind};

use crate::Mercato;

const IDLE: &str = "no recent activity";

impl Mercato {
    /// Last recorded status of every registered provider.
    ///
    /// Statuses are written by every aggregate call and expire with the
    /// provider-health TTL. Providers with nothing on record report `ok`
    /// with a "no recent activity" message.
    pub async fn health(&self) -> BTreeMap<String, ProviderStatus> {
        let mut out = BTreeMap::new();
        for adapter in &self.adapters {
            let name = adapter.name();
            let status = self
                .cache
                .provider_health(name)
                .await
                .unwrap_or_else(|| ProviderStatus {
                    status: StatusKind::Ok,
                    message: Some(IDLE.to_string()),
                    latency_ms: None,
                });
            out.insert(name.to_string(), status);
        }
        out
    }
}
