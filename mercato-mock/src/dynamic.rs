use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mercato_core::{
    Category, Cursor, InstrumentRef, InstrumentSnapshot, MarketAdapter, MercatoError, RefPage,
    paginate,
};

/// Instruction for how a call should behave for a given input.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(MercatoError),
    /// Hang indefinitely (simulate a stalled provider).
    Hang,
}

#[derive(Default)]
struct InternalState {
    listing_rules: HashMap<Category, MockBehavior<Vec<InstrumentRef>>>,
    snapshot_rules: HashMap<String, MockBehavior<InstrumentSnapshot>>,
    expected_counts: HashMap<Category, Option<usize>>,
    listing_requests: Vec<(Category, Option<Cursor>, usize)>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior of `list_refs` for a category.
    ///
    /// `Return(refs)` is paginated like any other stable listing.
    pub async fn set_listing(&self, category: Category, behavior: MockBehavior<Vec<InstrumentRef>>) {
        let mut guard = self.state.lock().await;
        guard.listing_rules.insert(category, behavior);
    }

    /// Set the behavior of `fetch_snapshots` for one symbol.
    ///
    /// Symbols without a rule are priced from their reference; a `Fail` rule
    /// drops the symbol from the result.
    pub async fn set_snapshot(&self, symbol: &str, behavior: MockBehavior<InstrumentSnapshot>) {
        let mut guard = self.state.lock().await;
        guard.snapshot_rules.insert(symbol.to_string(), behavior);
    }

    /// Override the count reported by `expected_count`.
    pub async fn set_expected_count(&self, category: Category, count: Option<usize>) {
        let mut guard = self.state.lock().await;
        guard.expected_counts.insert(category, count);
    }

    /// Copy of every `list_refs` call seen so far.
    pub async fn listing_requests(&self) -> Vec<(Category, Option<Cursor>, usize)> {
        self.state.lock().await.listing_requests.clone()
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.listing_rules.clear();
        guard.snapshot_rules.clear();
        guard.expected_counts.clear();
        guard.listing_requests.clear();
    }
}

/// An adapter that defers all behavior to an external controller.
///
/// Categories without a listing rule are unsupported.
pub struct DynamicMockAdapter {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockAdapter {
    /// Create a new dynamic mock adapter and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn MarketAdapter>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn MarketAdapter>, controller)
    }
}

#[async_trait]
impl MarketAdapter for DynamicMockAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "DynamicMock"
    }

    fn supports_category(&self, category: Category) -> bool {
        // A contended lock means a controller update is in flight; answer yes
        // and let `list_refs` decide.
        self.state
            .try_lock()
            .map_or(true, |g| g.listing_rules.contains_key(&category))
    }

    async fn list_refs(
        &self,
        category: Category,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<RefPage, MercatoError> {
        // Snapshot the behavior without holding the lock across the hang.
        let behavior = {
            let mut guard = self.state.lock().await;
            guard
                .listing_requests
                .push((category, cursor.cloned(), page_size));
            guard.listing_rules.get(&category).cloned()
        };
        match behavior {
            None => Ok(RefPage::empty()),
            Some(MockBehavior::Return(all)) => {
                let (refs, next_cursor) = paginate(&all, self.name, category, cursor, page_size);
                Ok(RefPage::new(refs, next_cursor))
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
        }
    }

    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        _hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        let rules: Vec<Option<MockBehavior<InstrumentSnapshot>>> = {
            let guard = self.state.lock().await;
            refs.iter()
                .map(|r| guard.snapshot_rules.get(&r.symbol).cloned())
                .collect()
        };
        let mut out = Vec::with_capacity(refs.len());
        for (r, rule) in refs.iter().zip(rules) {
            match rule {
                Some(MockBehavior::Return(s)) => out.push(s),
                Some(MockBehavior::Fail(_)) => {}
                Some(MockBehavior::Hang) => return std::future::pending().await,
                None => {
                    if let Some(price) = r.price {
                        out.push(InstrumentSnapshot::from_ref(self.name, r, price));
                    }
                }
            }
        }
        Ok(out)
    }

    async fn expected_count(&self, category: Category) -> Result<Option<usize>, MercatoError> {
        let guard = self.state.lock().await;
        if let Some(count) = guard.expected_counts.get(&category) {
            return Ok(*count);
        }
        Ok(match guard.listing_rules.get(&category) {
            Some(MockBehavior::Return(all)) => Some(all.len()),
            _ => None,
        })
    }
}
