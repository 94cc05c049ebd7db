//! Predicate suggestions
//!
//! Suggests predicates a resource does not yet use, scored by how often
//! they co-occur with the predicates it does use.
//!
//! For each qualifying predicate `p` of the resource (one seen on more than
//! one subject), a candidate `c` scores `cooc(c, p) / occ(p)`; the final
//! score is the product over all qualifying predicates. Only candidates that
//! co-occur with every qualifying predicate are kept.

use crate::rdf::{NamedNode, RdfSubject, TripleStore};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Predicates seen on at most this many subjects are not informative
const MIN_OCCURRENCE: usize = 1;

/// Occurrence and co-occurrence counts over subjects
#[derive(Debug, Clone, Default)]
pub struct PredicateStatistics {
    occurrence: FxHashMap<NamedNode, usize>,
    cooccurrence: FxHashMap<NamedNode, FxHashMap<NamedNode, usize>>,
}

impl PredicateStatistics {
    /// Count predicates per subject across the whole store
    pub fn compute(store: &TripleStore) -> Self {
        let mut occurrence: FxHashMap<NamedNode, usize> = FxHashMap::default();
        let mut cooccurrence: FxHashMap<NamedNode, FxHashMap<NamedNode, usize>> =
            FxHashMap::default();

        for (_, predicates) in store.predicate_sets() {
            for &p in &predicates {
                *occurrence.entry(p.clone()).or_insert(0) += 1;
                for &q in &predicates {
                    if p != q {
                        *cooccurrence
                            .entry(p.clone())
                            .or_default()
                            .entry(q.clone())
                            .or_insert(0) += 1;
                    }
                }
            }
        }
        occurrence.retain(|_, count| *count > MIN_OCCURRENCE);

        Self {
            occurrence,
            cooccurrence,
        }
    }

    /// Subjects using `predicate`; zero when it is not informative
    pub fn occurrence(&self, predicate: &NamedNode) -> usize {
        self.occurrence.get(predicate).copied().unwrap_or(0)
    }

    /// Subjects using both predicates
    pub fn cooccurrence(&self, a: &NamedNode, b: &NamedNode) -> usize {
        self.cooccurrence
            .get(a)
            .and_then(|m| m.get(b))
            .copied()
            .unwrap_or(0)
    }

    /// Predicates seen together with `predicate` on some subject
    pub fn cooccurring<'a>(&'a self, predicate: &NamedNode) -> impl Iterator<Item = &'a NamedNode> + 'a {
        self.cooccurrence
            .get(predicate)
            .into_iter()
            .flat_map(|m| m.keys())
    }

    /// Whether the predicate is used by more than one subject
    pub fn is_informative(&self, predicate: &NamedNode) -> bool {
        self.occurrence.contains_key(predicate)
    }
}

/// A suggested predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub predicate: NamedNode,
    pub score: f64,
}

struct CachedStatistics {
    store_id: u64,
    revision: u64,
    statistics: Arc<PredicateStatistics>,
}

/// Suggestion engine with cached statistics.
///
/// The cache is keyed by store identity and revision, so a write to the
/// store makes the next call recompute.
#[derive(Default)]
pub struct SuggestionEngine {
    cache: Mutex<Option<CachedStatistics>>,
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for the store's current revision
    pub fn statistics(&self, store: &TripleStore) -> Arc<PredicateStatistics> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.as_ref() {
            if cached.store_id == store.id() && cached.revision == store.revision() {
                return Arc::clone(&cached.statistics);
            }
        }

        let started = Instant::now();
        let statistics = Arc::new(PredicateStatistics::compute(store));
        debug!(
            store = store.id(),
            revision = store.revision(),
            predicates = statistics.occurrence.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computed predicate statistics"
        );
        *cache = Some(CachedStatistics {
            store_id: store.id(),
            revision: store.revision(),
            statistics: Arc::clone(&statistics),
        });
        statistics
    }

    /// Drop the cached statistics
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Predicates `resource` likely has but does not use, unordered
    pub fn suggest(&self, store: &TripleStore, resource: &NamedNode) -> Vec<Suggestion> {
        let own = store.predicates_of(&RdfSubject::from(resource.clone()));
        self.suggest_for_predicates(store, &own)
    }

    /// Suggestions for a resource described by its predicates alone, for
    /// resources not (yet) stored
    pub fn suggest_for_predicates(&self, store: &TripleStore, own: &[NamedNode]) -> Vec<Suggestion> {
        let statistics = self.statistics(store);
        let qualifying: Vec<&NamedNode> =
            own.iter().filter(|p| statistics.is_informative(p)).collect();
        let Some((first, rest)) = qualifying.split_first() else {
            return Vec::new();
        };

        let mut candidates: FxHashSet<&NamedNode> = statistics.cooccurring(first).collect();
        for p in rest {
            let other: FxHashSet<&NamedNode> = statistics.cooccurring(p).collect();
            candidates.retain(|c| other.contains(c));
        }
        for p in own {
            candidates.remove(p);
        }

        candidates
            .into_iter()
            .map(|candidate| {
                let score = qualifying.iter().fold(1.0, |score, p| {
                    score * statistics.cooccurrence(candidate, p) as f64
                        / statistics.occurrence(p) as f64
                });
                Suggestion {
                    predicate: candidate.clone(),
                    score,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .lock()
            .map(|c| c.as_ref().map(|c| (c.store_id, c.revision)))
            .unwrap_or(None);
        f.debug_struct("SuggestionEngine").field("cached", &cached).finish()
    }
}
