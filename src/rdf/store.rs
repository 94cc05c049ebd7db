//! In-memory triple store backing the local adapter
//!
//! Triples are indexed by subject (SPO) and by predicate (POS). Every write
//! bumps a revision counter so derived views, such as the predicate
//! statistics used for suggestions, can tell when they are stale.

use super::types::{NamedNode, RdfObject, RdfSubject, Triple};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Triple store errors
#[derive(Error, Debug)]
pub enum TripleStoreError {
    /// Triple not found
    #[error("Triple not found: {0}")]
    TripleNotFound(String),

    /// Duplicate triple
    #[error("Duplicate triple: {0}")]
    DuplicateTriple(String),
}

pub type TripleStoreResult<T> = Result<T, TripleStoreError>;

/// Triple store with SPO and POS indices
pub struct TripleStore {
    id: u64,
    revision: u64,

    /// All triples (primary storage)
    triples: HashSet<Triple>,

    /// Subject -> Predicate -> Objects
    spo_index: HashMap<RdfSubject, HashMap<NamedNode, HashSet<RdfObject>>>,

    /// Predicate -> Object -> Subjects
    pos_index: HashMap<NamedNode, HashMap<RdfObject, HashSet<RdfSubject>>>,
}

impl TripleStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
            triples: HashSet::new(),
            spo_index: HashMap::new(),
            pos_index: HashMap::new(),
        }
    }

    /// Process-unique identity of this store
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Incremented on every successful write
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert a triple into the store
    pub fn insert(&mut self, triple: Triple) -> TripleStoreResult<()> {
        if self.triples.contains(&triple) {
            return Err(TripleStoreError::DuplicateTriple(triple.to_string()));
        }

        self.spo_index
            .entry(triple.subject.clone())
            .or_default()
            .entry(triple.predicate.clone())
            .or_default()
            .insert(triple.object.clone());

        self.pos_index
            .entry(triple.predicate.clone())
            .or_default()
            .entry(triple.object.clone())
            .or_default()
            .insert(triple.subject.clone());

        self.triples.insert(triple);
        self.revision += 1;
        Ok(())
    }

    /// Remove a triple from the store
    pub fn remove(&mut self, triple: &Triple) -> TripleStoreResult<()> {
        if !self.triples.remove(triple) {
            return Err(TripleStoreError::TripleNotFound(triple.to_string()));
        }

        if let Some(preds) = self.spo_index.get_mut(&triple.subject) {
            if let Some(objs) = preds.get_mut(&triple.predicate) {
                objs.remove(&triple.object);
                if objs.is_empty() {
                    preds.remove(&triple.predicate);
                }
            }
            if preds.is_empty() {
                self.spo_index.remove(&triple.subject);
            }
        }

        if let Some(objs) = self.pos_index.get_mut(&triple.predicate) {
            if let Some(subjs) = objs.get_mut(&triple.object) {
                subjs.remove(&triple.subject);
                if subjs.is_empty() {
                    objs.remove(&triple.object);
                }
            }
            if objs.is_empty() {
                self.pos_index.remove(&triple.predicate);
            }
        }

        self.revision += 1;
        Ok(())
    }

    /// Check if a triple exists in the store
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Get the total number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        self.triples.clear();
        self.spo_index.clear();
        self.pos_index.clear();
        self.revision += 1;
    }

    /// Get an iterator over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples matching the given fixed positions (`None` = any).
    ///
    /// Uses the subject index when the subject is fixed, the predicate
    /// index when only the predicate is, and a full scan otherwise.
    pub fn matching(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&NamedNode>,
        object: Option<&RdfObject>,
    ) -> Vec<Triple> {
        let mut out = Vec::new();

        if let Some(s) = subject {
            let Some(preds) = self.spo_index.get(s) else {
                return out;
            };
            for (p, objs) in preds {
                if predicate.is_some_and(|want| want != p) {
                    continue;
                }
                for o in objs {
                    if object.is_some_and(|want| want != o) {
                        continue;
                    }
                    out.push(Triple::new(s.clone(), p.clone(), o.clone()));
                }
            }
            return out;
        }

        if let Some(p) = predicate {
            let Some(objs) = self.pos_index.get(p) else {
                return out;
            };
            match object {
                Some(o) => {
                    if let Some(subjs) = objs.get(o) {
                        for s in subjs {
                            out.push(Triple::new(s.clone(), p.clone(), o.clone()));
                        }
                    }
                }
                None => {
                    for (o, subjs) in objs {
                        for s in subjs {
                            out.push(Triple::new(s.clone(), p.clone(), o.clone()));
                        }
                    }
                }
            }
            return out;
        }

        self.triples
            .iter()
            .filter(|t| object.map_or(true, |o| &t.object == o))
            .cloned()
            .collect()
    }

    /// Distinct predicates asserted directly on a subject
    pub fn predicates_of(&self, subject: &RdfSubject) -> Vec<NamedNode> {
        self.spo_index
            .get(subject)
            .map(|preds| preds.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Each subject with the set of distinct predicates it uses
    pub fn predicate_sets(&self) -> impl Iterator<Item = (&RdfSubject, Vec<&NamedNode>)> {
        self.spo_index
            .iter()
            .map(|(s, preds)| (s, preds.keys().collect()))
    }

    /// Number of distinct subjects
    pub fn subject_count(&self) -> usize {
        self.spo_index.len()
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStore")
            .field("id", &self.id)
            .field("revision", &self.revision)
            .field("triples", &self.triples.len())
            .finish()
    }
}

impl Clone for TripleStore {
    /// A clone is a separate store and gets its own identity.
    fn clone(&self) -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            revision: self.revision,
            triples: self.triples.clone(),
            spo_index: self.spo_index.clone(),
            pos_index: self.pos_index.clone(),
        }
    }
}
