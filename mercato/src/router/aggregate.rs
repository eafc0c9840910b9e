use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use mercato_core::{
    AggregateCursor, AggregateMeta, AggregateResponse, Category, Cursor, InstrumentSnapshot,
    MarketAdapter, MercatoError, ProviderStatus, StatusKind, UnitCursor, dedupe,
};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::Mercato;
use crate::core::tag_err;
use crate::request::{AggregateRequest, Plan};
use crate::router::util::join_with_deadline;

const CAPABILITY: &str = "aggregate";
const ENDPOINT: &str = "aggregate";

/// One (provider, category) pair scheduled by an aggregate call.
struct Unit {
    index: usize,
    adapter: Arc<dyn MarketAdapter>,
    category: Category,
    cursor: Option<Cursor>,
}

struct UnitPage {
    snapshots: Vec<InstrumentSnapshot>,
    next: Option<Cursor>,
    /// The adapter's listing was incomplete.
    partial: Option<String>,
}

struct UnitOutcome {
    index: usize,
    provider: &'static str,
    category: Category,
    latency_ms: u64,
    result: Result<UnitPage, MercatoError>,
}

fn millis_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Roll a provider's unit outcomes into one status.
///
/// `ok` when every unit succeeded from a complete listing, `degraded` when
/// some failed but data still arrived or a listing came back truncated, `fail`
/// when at least one unit failed and nothing arrived. The latency is that of
/// the slowest unit.
fn roll_up(provider: &str, outcomes: &[UnitOutcome]) -> ProviderStatus {
    let mine: Vec<&UnitOutcome> = outcomes.iter().filter(|o| o.provider == provider).collect();
    if mine.is_empty() {
        return ProviderStatus::ok(None);
    }
    let latency = mine.iter().map(|o| o.latency_ms).max();
    let failures: Vec<String> = mine
        .iter()
        .filter_map(|o| {
            o.result
                .as_ref()
                .err()
                .map(|e| format!("{}: {e}", o.category))
        })
        .collect();
    let truncated: Vec<String> = mine
        .iter()
        .filter_map(|o| {
            let reason = o.result.as_ref().ok()?.partial.as_ref()?;
            Some(format!("{}: {reason}", o.category))
        })
        .collect();
    let delivered: usize = mine
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .map(|p| p.snapshots.len())
        .sum();

    let problems: Vec<&String> = failures.iter().chain(&truncated).collect();
    let Some(first) = problems.first() else {
        return ProviderStatus::ok(latency);
    };
    let message = if problems.len() > 1 {
        format!("{first} (+{} more)", problems.len() - 1)
    } else {
        (*first).clone()
    };
    if !failures.is_empty() && delivered == 0 {
        ProviderStatus::fail(message, latency)
    } else {
        ProviderStatus::degraded(message, latency)
    }
}

impl Mercato {
    /// Fetch one page of validated snapshots per (provider, category).
    ///
    /// Behavior and trade-offs:
    /// - Input is checked before any adapter is called: page size, concurrency
    ///   and hours window must be within the configured limits, and every
    ///   named provider and category must exist.
    /// - Units run under a counting semaphore of `max_concurrency` permits.
    ///   Each is bounded by the provider timeout; the whole call is bounded by
    ///   the request timeout when one is configured. Failures, timeouts and
    ///   panics of a unit turn into a provider status and never affect
    ///   sibling units.
    /// - Data is flattened in scheduling order (providers, then categories),
    ///   each unit keeping its adapter's order, and optionally deduplicated
    ///   by the provider priority table.
    /// - `meta.next_cursor` resumes only the units that still have pages.
    ///   Units that failed are not carried over.
    /// - Responses where every provider is `ok` are cached for the
    ///   api-response TTL unless the request sets `no_cache`.
    ///
    /// # Errors
    /// Returns `InvalidArg` for out-of-range parameters or unknown providers
    /// and categories. Provider failures never surface as errors.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "mercato::router::aggregate",
            skip(self, req),
            fields(
                providers = req.providers.len(),
                categories = req.categories.len(),
                page_size = ?req.page_size,
                no_cache = req.no_cache,
            ),
        )
    )]
    pub async fn aggregate(&self, req: AggregateRequest) -> Result<AggregateResponse, MercatoError> {
        let plan = self.plan(&req)?;

        let cache_params = (!req.no_cache).then(|| Self::cache_params(&plan, &req));
        if let Some(params) = &cache_params
            && let Some(hit) = self.cache.api_response::<AggregateResponse>(ENDPOINT, params).await
        {
            return Ok(hit);
        }

        let units = Self::schedule(&plan);
        let started = Instant::now();
        let semaphore = Semaphore::new(plan.concurrency);
        let tasks = units
            .iter()
            .map(|u| self.run_unit(&semaphore, u, plan.page_size, plan.hours_window));
        let (mut outcomes, _expired) = join_with_deadline(tasks, self.cfg.request_timeout).await;

        #[cfg(feature = "tracing")]
        if _expired {
            tracing::warn!(
                finished = outcomes.len(),
                scheduled = units.len(),
                "request deadline reached; abandoning unfinished units"
            );
        }

        // Units abandoned at the deadline count as failures.
        let finished: HashSet<usize> = outcomes.iter().map(|o| o.index).collect();
        let abandoned_latency = millis_since(started);
        for u in units.iter().filter(|u| !finished.contains(&u.index)) {
            outcomes.push(UnitOutcome {
                index: u.index,
                provider: u.adapter.name(),
                category: u.category,
                latency_ms: abandoned_latency,
                result: Err(MercatoError::request_timeout(CAPABILITY)),
            });
        }
        outcomes.sort_by_key(|o| o.index);

        let status: BTreeMap<String, ProviderStatus> = plan
            .providers
            .iter()
            .map(|a| (a.name().to_string(), roll_up(a.name(), &outcomes)))
            .collect();

        let mut pending: Vec<UnitCursor> = Vec::new();
        let mut data: Vec<InstrumentSnapshot> = Vec::new();
        for o in outcomes {
            if let Ok(page) = o.result {
                if let Some(cursor) = page.next {
                    pending.push(UnitCursor {
                        provider: o.provider.to_string(),
                        category: o.category,
                        cursor,
                    });
                }
                data.extend(page.snapshots);
            }
        }
        if plan.dedupe {
            data = dedupe(data, &self.priority);
        }

        let next_cursor = (!pending.is_empty()).then(|| {
            AggregateCursor {
                providers: plan.providers.iter().map(|a| a.name().to_string()).collect(),
                categories: plan.categories.clone(),
                page_size: plan.page_size,
                units: pending,
            }
            .encode()
        });

        for (provider, s) in &status {
            self.cache.put_provider_health(provider, s).await;
        }

        let response = AggregateResponse {
            meta: AggregateMeta {
                timestamp: chrono::Utc::now(),
                providers: plan.providers.iter().map(|a| a.name().to_string()).collect(),
                categories: plan.categories.clone(),
                page_size: plan.page_size,
                hours_window: plan.hours_window,
                status,
                next_cursor,
            },
            data,
        };

        if let Some(params) = &cache_params
            && response.meta.status.values().all(|s| s.status == StatusKind::Ok)
        {
            self.cache.put_api_response(ENDPOINT, params, &response).await;
        }
        Ok(response)
    }

    fn cache_params(plan: &Plan, req: &AggregateRequest) -> BTreeMap<&'static str, String> {
        let providers: Vec<&str> = plan.providers.iter().map(|a| a.name()).collect();
        let categories: Vec<&str> = plan.categories.iter().map(|c| c.as_str()).collect();
        BTreeMap::from([
            ("providers", providers.join(",")),
            ("categories", categories.join(",")),
            ("page_size", plan.page_size.to_string()),
            ("hours_window", plan.hours_window.to_string()),
            ("dedupe", plan.dedupe.to_string()),
            ("cursor", req.cursor.clone().unwrap_or_default()),
        ])
    }

    /// Cartesian product of providers and categories, minus unsupported and
    /// exhausted pairs.
    fn schedule(plan: &Plan) -> Vec<Unit> {
        let mut units = Vec::new();
        for adapter in &plan.providers {
            for &category in &plan.categories {
                if !adapter.supports_category(category) {
                    continue;
                }
                let Some(cursor) = plan.resume.for_unit(adapter.name(), category) else {
                    continue;
                };
                units.push(Unit {
                    index: units.len(),
                    adapter: Arc::clone(adapter),
                    category,
                    cursor,
                });
            }
        }
        units
    }

    async fn run_unit(
        &self,
        semaphore: &Semaphore,
        unit: &Unit,
        page_size: usize,
        hours_window: u32,
    ) -> UnitOutcome {
        let name = unit.adapter.name();
        let outcome = |started: Instant, result| UnitOutcome {
            index: unit.index,
            provider: name,
            category: unit.category,
            latency_ms: millis_since(started),
            result,
        };

        let Ok(_permit) = semaphore.acquire().await else {
            return outcome(
                Instant::now(),
                Err(MercatoError::Other("unit scheduler closed".into())),
            );
        };
        let started = Instant::now();
        let work = Self::provider_call_with_timeout(
            name,
            CAPABILITY,
            self.cfg.provider_timeout,
            self.unit_page(unit, page_size, hours_window),
        );
        let result = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(r) => r.map_err(|e| tag_err(name, e)),
            Err(_) => Err(MercatoError::connector(
                name,
                format!("{} unit panicked", unit.category),
            )),
        };

        #[cfg(feature = "tracing")]
        if let Err(e) = &result {
            tracing::warn!(
                provider = name,
                category = unit.category.as_str(),
                error = %e,
                "unit failed"
            );
        }
        outcome(started, result)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "mercato::router::unit",
            skip(self, unit),
            fields(provider = unit.adapter.name(), category = unit.category.as_str()),
        )
    )]
    async fn unit_page(
        &self,
        unit: &Unit,
        page_size: usize,
        hours_window: u32,
    ) -> Result<UnitPage, MercatoError> {
        let page = unit
            .adapter
            .list_refs(unit.category, unit.cursor.as_ref(), page_size)
            .await?;
        if page.refs.is_empty() {
            return Ok(UnitPage {
                snapshots: Vec::new(),
                next: page.next_cursor,
                partial: page.partial,
            });
        }
        let raw = unit.adapter.fetch_snapshots(&page.refs, hours_window).await?;
        let listed: HashSet<&str> = page.refs.iter().map(|r| r.symbol.as_str()).collect();
        let snapshots: Vec<InstrumentSnapshot> = raw
            .into_iter()
            .filter(|s| listed.contains(s.symbol.as_str()) && self.validator.validate(s))
            .collect();
        Ok(UnitPage {
            snapshots,
            next: page.next_cursor,
            partial: page.partial,
        })
    }
}
