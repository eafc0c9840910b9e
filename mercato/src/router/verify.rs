use std::sync::Arc;

use mercato_core::{
    Category, CategoryVerification, Cursor, InstrumentRef, MarketAdapter, MercatoError,
    SampleCheck, VerifyReport, VerifyStatus,
};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::Mercato;
use crate::core::tag_err;
use crate::router::util::join_with_deadline;

/// Result of walking every page of one listing.
struct Walk {
    count: usize,
    truncated: bool,
    sample: Vec<InstrumentRef>,
    /// First reason the adapter gave for an incomplete listing.
    partial: Option<String>,
}

fn prices_agree(listed: f64, fetched: f64) -> bool {
    (listed - fetched).abs() <= (listed.abs() * 1e-6).max(1e-9)
}

impl Mercato {
    /// Walk every page of each (provider, category) and compare the count
    /// with the adapter's own row-count hint.
    ///
    /// Behavior and trade-offs:
    /// - Empty slices mean every registered provider and every category;
    ///   pairs the adapter does not support are skipped.
    /// - Walks use the largest allowed page size and stop after
    ///   `verify_cap` elements, reporting `Truncated`.
    /// - A failing hint only downgrades the result to `Unverified`; a failing
    ///   walk reports `Error` with the message. An adapter that reports its
    ///   listing as incomplete has the reason copied into `message`.
    /// - The first `verify_sample_size` references are re-fetched as
    ///   snapshots and checked for validity and price consistency.
    /// - Walks run concurrently under `max_concurrency` permits; each page
    ///   call is bounded by the provider timeout.
    ///
    /// # Errors
    /// Returns `InvalidArg` when a provider name is not registered.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "mercato::router::verify", skip(self))
    )]
    pub async fn verify(
        &self,
        categories: &[Category],
        providers: &[&str],
    ) -> Result<VerifyReport, MercatoError> {
        let adapters: Vec<Arc<dyn MarketAdapter>> = if providers.is_empty() {
            self.adapters.clone()
        } else {
            providers
                .iter()
                .map(|n| {
                    self.adapter(n)
                        .cloned()
                        .ok_or_else(|| MercatoError::InvalidArg(format!("unknown provider '{n}'")))
                })
                .collect::<Result<_, _>>()?
        };
        let categories: Vec<Category> = if categories.is_empty() {
            Category::ALL.to_vec()
        } else {
            categories.to_vec()
        };

        let pairs: Vec<(usize, Arc<dyn MarketAdapter>, Category)> = adapters
            .iter()
            .flat_map(|a| {
                categories
                    .iter()
                    .filter(|c| a.supports_category(**c))
                    .map(move |c| (Arc::clone(a), *c))
            })
            .enumerate()
            .map(|(i, (a, c))| (i, a, c))
            .collect();

        let semaphore = Semaphore::new(self.cfg.max_concurrency.max(1));
        let tasks = pairs.iter().map(|(i, adapter, category)| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                (*i, self.verify_one(adapter, *category).await)
            }
        });
        let (mut results, _) = join_with_deadline(tasks, None).await;
        results.sort_by_key(|(i, _)| *i);

        Ok(VerifyReport {
            timestamp: chrono::Utc::now(),
            results: results.into_iter().map(|(_, r)| r).collect(),
        })
    }

    async fn verify_one(
        &self,
        adapter: &Arc<dyn MarketAdapter>,
        category: Category,
    ) -> CategoryVerification {
        let started = Instant::now();
        let name = adapter.name();
        let timeout = self.cfg.provider_timeout;

        let expected_count = match Self::provider_call_with_timeout(
            name,
            "expected_count",
            timeout,
            adapter.expected_count(category),
        )
        .await
        {
            Ok(n) => n,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(provider = name, category = category.as_str(), error = %_e, "count hint unavailable");
                None
            }
        };

        let walk = self.walk(adapter, category).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut report = CategoryVerification {
            provider: name.to_string(),
            category,
            expected_count,
            scraped_count: 0,
            status: VerifyStatus::Error,
            message: None,
            latency_ms,
            samples: Vec::new(),
        };
        let walk = match walk {
            Ok(w) => w,
            Err(e) => {
                report.message = Some(tag_err(name, e).to_string());
                return report;
            }
        };

        report.scraped_count = walk.count;
        report.message = walk.partial;
        report.status = match (walk.truncated, expected_count) {
            (true, _) => VerifyStatus::Truncated,
            (false, Some(n)) if n == walk.count => VerifyStatus::Match,
            (false, Some(_)) => VerifyStatus::Mismatch,
            (false, None) => VerifyStatus::Unverified,
        };
        report.samples = self.check_samples(adapter, &walk.sample).await;
        report
    }

    async fn walk(
        &self,
        adapter: &Arc<dyn MarketAdapter>,
        category: Category,
    ) -> Result<Walk, MercatoError> {
        let name = adapter.name();
        let page_size = self.cfg.max_page_size;
        let cap = self.cfg.verify_cap;
        let mut walk = Walk {
            count: 0,
            truncated: false,
            sample: Vec::new(),
            partial: None,
        };
        let mut cursor: Option<Cursor> = None;

        loop {
            let page = Self::provider_call_with_timeout(
                name,
                "list_refs",
                self.cfg.provider_timeout,
                adapter.list_refs(category, cursor.as_ref(), page_size),
            )
            .await?;
            if walk.partial.is_none() {
                walk.partial = page.partial;
            }

            for r in page.refs {
                if walk.count == cap {
                    walk.truncated = true;
                    break;
                }
                walk.count += 1;
                if walk.sample.len() < self.cfg.verify_sample_size {
                    walk.sample.push(r);
                }
            }
            if walk.truncated {
                return Ok(walk);
            }

            let Some(next) = page.next_cursor else {
                return Ok(walk);
            };
            if walk.count == cap {
                walk.truncated = true;
                return Ok(walk);
            }
            let previous = cursor.as_ref().map_or(0, |c| c.offset);
            if next.offset <= previous {
                return Err(MercatoError::Data(format!(
                    "{category} cursor did not advance past offset {previous}"
                )));
            }
            cursor = Some(next);
        }
    }

    async fn check_samples(
        &self,
        adapter: &Arc<dyn MarketAdapter>,
        sample: &[InstrumentRef],
    ) -> Vec<SampleCheck> {
        if sample.is_empty() {
            return Vec::new();
        }
        let fetched = Self::provider_call_with_timeout(
            adapter.name(),
            "fetch_snapshots",
            self.cfg.provider_timeout,
            adapter.fetch_snapshots(sample, self.cfg.default_hours_window),
        )
        .await
        .unwrap_or_default();

        sample
            .iter()
            .map(|r| {
                let snap = fetched.iter().find(|s| s.symbol == r.symbol);
                let snapshot_price = snap.map(|s| s.price);
                SampleCheck {
                    symbol: r.symbol.clone(),
                    listed_price: r.price,
                    snapshot_price,
                    valid: snap.is_some_and(|s| self.validator.validate(s)),
                    consistent: match (r.price, snapshot_price) {
                        (Some(listed), Some(fetched)) => prices_agree(listed, fetched),
                        (None, Some(_)) => true,
                        (_, None) => false,
                    },
                }
            })
            .collect()
    }
}
