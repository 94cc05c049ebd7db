//! LocalAdapter: embedded triple store answering native dialect queries
//!
//! Evaluation is a left-to-right nested-loop join over the where-clause
//! patterns, each step looked up through the store's indices.

use crate::error::RdfQueryResult;
use crate::query::{parse_native, NativePattern, NativeQuery, ObjectMatch, Projection};
use crate::rdf::{load_ntriples, NamedNode, Node, RdfObject, ResultRow, Term, Triple, TripleStore, Variable};
use crate::suggest::{Suggestion, SuggestionEngine};
use indexmap::IndexSet;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

type Solution = HashMap<Variable, RdfObject>;

/// Backend over an in-process [`TripleStore`]
#[derive(Debug, Clone, Default)]
pub struct LocalAdapter {
    store: Arc<RwLock<TripleStore>>,
    suggestions: Arc<SuggestionEngine>,
}

impl LocalAdapter {
    /// Adapter over an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter owning a populated store
    pub fn from_store(store: TripleStore) -> Self {
        Self::with_store(Arc::new(RwLock::new(store)))
    }

    /// Adapter sharing a store with other handles
    pub fn with_store(store: Arc<RwLock<TripleStore>>) -> Self {
        Self {
            store,
            suggestions: Arc::new(SuggestionEngine::new()),
        }
    }

    pub fn store(&self) -> &Arc<RwLock<TripleStore>> {
        &self.store
    }

    /// Number of stored triples
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn insert(&self, triple: Triple) -> RdfQueryResult<()> {
        self.store.write().await.insert(triple)?;
        Ok(())
    }

    pub async fn remove(&self, triple: &Triple) -> RdfQueryResult<()> {
        self.store.write().await.remove(triple)?;
        Ok(())
    }

    /// Load N-Triples into the store, returning the number of new triples
    pub async fn load_ntriples<R: BufRead>(&self, reader: R) -> RdfQueryResult<usize> {
        let mut store = self.store.write().await;
        let added = load_ntriples(reader, &mut store)?;
        info!(added, total = store.len(), "loaded N-Triples into local store");
        Ok(added)
    }

    /// Run a native dialect query and collect every row
    pub async fn query(&self, query: &str) -> RdfQueryResult<Vec<ResultRow>> {
        let parsed = parse_native(query)?;
        let store = self.store.read().await;
        let rows = evaluate(&parsed, &store);
        debug!(rows = rows.len(), store = store.id(), "evaluated native query");
        Ok(rows)
    }

    /// Run a native dialect query, handing each row to `on_row`
    pub async fn query_with<F>(&self, query: &str, on_row: F) -> RdfQueryResult<usize>
    where
        F: FnMut(ResultRow),
    {
        let rows = self.query(query).await?;
        let count = rows.len();
        rows.into_iter().for_each(on_row);
        Ok(count)
    }

    /// Predicates the resource likely has but does not yet use
    pub async fn suggest(&self, resource: &NamedNode) -> Vec<Suggestion> {
        let store = self.store.read().await;
        self.suggestions.suggest(&store, resource)
    }

    /// Drop cached predicate statistics
    pub fn invalidate_suggestions(&self) {
        self.suggestions.invalidate();
    }
}

/// Evaluate a parsed native query against a store
pub(crate) fn evaluate(query: &NativeQuery, store: &TripleStore) -> Vec<ResultRow> {
    let mut solutions = vec![Solution::new()];
    for pattern in &query.patterns {
        let mut extended = Vec::new();
        for solution in &solutions {
            extend(pattern, solution, store, &mut extended);
        }
        solutions = extended;
        if solutions.is_empty() {
            break;
        }
    }

    if !query.order.is_empty() {
        solutions.sort_by(|a, b| {
            for (var, descending) in &query.order {
                let ordering = compare_values(a.get(var), b.get(var));
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let rows: Vec<ResultRow> = match &query.projection {
        Projection::All => {
            let vars = pattern_variables(&query.patterns);
            solutions.iter().map(|s| project_variables(&vars, s)).collect()
        }
        Projection::Variables(vars) => solutions.iter().map(|s| project_variables(vars, s)).collect(),
        Projection::Triple(triple) => solutions
            .iter()
            .map(|s| {
                ResultRow::new(
                    triple
                        .terms()
                        .into_iter()
                        .map(|term| resolve(term, s).and_then(Node::from_object))
                        .collect(),
                )
            })
            .collect(),
    };

    if query.distinct {
        rows.into_iter()
            .collect::<IndexSet<ResultRow>>()
            .into_iter()
            .collect()
    } else {
        rows
    }
}

fn extend(pattern: &NativePattern, solution: &Solution, store: &TripleStore, out: &mut Vec<Solution>) {
    let subject = match resolve(&pattern.subject, solution) {
        Some(value) => match value.as_subject() {
            Some(subject) => Some(subject),
            None => return,
        },
        None => None,
    };
    let predicate = match resolve(&pattern.predicate, solution) {
        Some(RdfObject::NamedNode(n)) => Some(n),
        Some(_) => return,
        None => None,
    };
    let (object_term, keyword) = match &pattern.object {
        ObjectMatch::Term(term) => (Some(term), None),
        ObjectMatch::Keyword(keyword) => (None, Some(keyword.to_lowercase())),
    };
    let object = object_term.and_then(|t| resolve(t, solution));

    for triple in store.matching(subject.as_ref(), predicate.as_ref(), object.as_ref()) {
        if let Some(keyword) = &keyword {
            match &triple.object {
                RdfObject::Literal(lit) if lit.value().to_lowercase().contains(keyword.as_str()) => {}
                _ => continue,
            }
        }
        let mut next = solution.clone();
        let consistent = bind(&mut next, &pattern.subject, triple.subject.into())
            && bind(&mut next, &pattern.predicate, RdfObject::NamedNode(triple.predicate))
            && object_term.map_or(true, |t| bind(&mut next, t, triple.object));
        if consistent {
            out.push(next);
        }
    }
}

/// Concrete value of a term under a solution, `None` when still free
fn resolve(term: &Term, solution: &Solution) -> Option<RdfObject> {
    match term {
        Term::Variable(v) => solution.get(v).cloned(),
        other => other.to_object(),
    }
}

/// Bind a variable, or check an existing binding agrees
fn bind(solution: &mut Solution, term: &Term, value: RdfObject) -> bool {
    let Term::Variable(var) = term else {
        return true;
    };
    match solution.get(var) {
        Some(existing) => *existing == value,
        None => {
            solution.insert(var.clone(), value);
            true
        }
    }
}

fn pattern_variables(patterns: &[NativePattern]) -> Vec<Variable> {
    let mut vars = IndexSet::new();
    for pattern in patterns {
        let object = match &pattern.object {
            ObjectMatch::Term(term) => Some(term),
            ObjectMatch::Keyword(_) => None,
        };
        for term in [Some(&pattern.subject), Some(&pattern.predicate), object].into_iter().flatten() {
            if let Term::Variable(v) = term {
                vars.insert(v.clone());
            }
        }
    }
    vars.into_iter().collect()
}

fn project_variables(vars: &[Variable], solution: &Solution) -> ResultRow {
    ResultRow::new(
        vars.iter()
            .map(|v| solution.get(v).cloned().and_then(Node::from_object))
            .collect(),
    )
}

/// Unbound < blank < IRI < literal; numeric literals sort before the rest
fn compare_values(a: Option<&RdfObject>, b: Option<&RdfObject>) -> Ordering {
    fn rank(value: Option<&RdfObject>) -> u8 {
        match value {
            None => 0,
            Some(RdfObject::BlankNode(_)) => 1,
            Some(RdfObject::NamedNode(_)) => 2,
            Some(RdfObject::Literal(_)) => 3,
        }
    }

    match (a, b) {
        (Some(RdfObject::BlankNode(x)), Some(RdfObject::BlankNode(y))) => x.as_str().cmp(y.as_str()),
        (Some(RdfObject::NamedNode(x)), Some(RdfObject::NamedNode(y))) => x.as_str().cmp(y.as_str()),
        (Some(RdfObject::Literal(x)), Some(RdfObject::Literal(y))) => {
            match (numeric(x.value()), numeric(y.value())) {
                (Some(m), Some(n)) => m.total_cmp(&n).then_with(|| x.value().cmp(y.value())),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => x.value().cmp(y.value()),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Finite numeric value of a lexical form; `NaN` and infinities count as text
fn numeric(lexical: &str) -> Option<f64> {
    lexical.parse::<f64>().ok().filter(|n| n.is_finite())
}
