use std::collections::HashMap;
use std::collections::hash_map::Entry;

use mercato_types::InstrumentSnapshot;

/// Static provider ordering used to break duplicate symbols.
///
/// Lower rank wins. Providers missing from the table rank after every listed
/// provider and tie with each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTable {
    ranks: HashMap<String, usize>,
}

impl PriorityTable {
    /// Build a table from provider names in descending priority.
    ///
    /// Repeated names keep their first position.
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (i, name) in order.into_iter().enumerate() {
            ranks.entry(name.into()).or_insert(i);
        }
        Self { ranks }
    }

    /// Rank of `provider`; unlisted providers get `usize::MAX`.
    #[must_use]
    pub fn rank(&self, provider: &str) -> usize {
        self.ranks.get(provider).copied().unwrap_or(usize::MAX)
    }

    /// Returns true when no provider is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Collapse snapshots sharing a symbol into one.
///
/// Symbols are compared exactly. For each symbol the snapshot from the
/// best-ranked provider survives; ties go to the first seen. Survivors keep the
/// position of their symbol's first appearance, so the output is
/// deterministic and `dedupe(dedupe(xs)) == dedupe(xs)`.
#[must_use]
pub fn dedupe(snapshots: Vec<InstrumentSnapshot>, priority: &PriorityTable) -> Vec<InstrumentSnapshot> {
    let mut out: Vec<InstrumentSnapshot> = Vec::with_capacity(snapshots.len());
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(snapshots.len());

    for snap in snapshots {
        match slot.entry(snap.symbol.clone()) {
            Entry::Vacant(v) => {
                v.insert(out.len());
                out.push(snap);
            }
            Entry::Occupied(o) => {
                let kept = &mut out[*o.get()];
                if priority.rank(&snap.provider) < priority.rank(&kept.provider) {
                    *kept = snap;
                }
            }
        }
    }
    out
}
