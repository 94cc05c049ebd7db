//! Abstract triple-pattern queries
//!
//! A [`QueryModel`] accumulates projected variables, conditions, ordering
//! and flags. It is translated by the generator matching the backend's
//! [`QueryLanguage`] and consumed by [`QueryModel::execute`].
//!
//! # Example
//!
//! ```rust
//! use rdfquery::query::{QueryModel, QueryLanguage};
//! use rdfquery::rdf::{NamedNode, Variable};
//!
//! let s = Variable::new("s").unwrap();
//! let knows = NamedNode::new("http://xmlns.com/foaf/0.1/knows").unwrap();
//! let bob = NamedNode::new("http://example.org/bob").unwrap();
//!
//! let mut model = QueryModel::new();
//! model.add_binding_variables([s.clone()]).add_condition(s, knows, bob);
//!
//! let sparql = model.generate(QueryLanguage::Sparql).unwrap();
//! assert_eq!(
//!     sparql,
//!     "SELECT ?s WHERE { ?s <http://xmlns.com/foaf/0.1/knows> <http://example.org/bob> . }"
//! );
//! ```

mod native;
mod parser;
mod sparql;

pub use native::NativeGenerator;
pub use parser::{parse_native, NativePattern, NativeQuery, ObjectMatch, Projection};
pub use sparql::SparqlGenerator;

use crate::adapter::Backend;
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::{NamedNode, ResultRow, Term, TriplePattern, Variable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Query language declared by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    /// SPARQL SELECT queries
    Sparql,
    /// Native triple-pattern dialect
    #[serde(alias = "n3")]
    Native,
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryLanguage::Sparql => write!(f, "sparql"),
            QueryLanguage::Native => write!(f, "native"),
        }
    }
}

impl FromStr for QueryLanguage {
    type Err = RdfQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sparql" => Ok(QueryLanguage::Sparql),
            "native" | "n3" => Ok(QueryLanguage::Native),
            other => Err(RdfQueryError::Config(format!("unknown query language: {other}"))),
        }
    }
}

/// Maps short predicate names of a related resource to full URIs
pub trait PredicateResolver: Send + Sync {
    /// Resolve a symbolic predicate name
    fn resolve(&self, name: &str) -> Option<NamedNode>;
}

impl PredicateResolver for HashMap<String, NamedNode> {
    fn resolve(&self, name: &str) -> Option<NamedNode> {
        self.get(name).cloned()
    }
}

/// Result of executing a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    /// Decoded rows, in backend order
    Rows(Vec<ResultRow>),
    /// Number of distinct rows of a counting query
    Count(usize),
}

impl QueryOutput {
    /// Rows, if this is not a count
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            QueryOutput::Count(_) => None,
        }
    }

    /// Count, if this is a counting result
    pub fn count(&self) -> Option<usize> {
        match self {
            QueryOutput::Count(n) => Some(*n),
            QueryOutput::Rows(_) => None,
        }
    }
}

/// Accumulator for one pending query.
///
/// Not reusable: [`execute`](Self::execute) takes the model by value.
#[derive(Clone, Default)]
pub struct QueryModel {
    resolver: Option<Arc<dyn PredicateResolver>>,
    bindings: Vec<Variable>,
    binding_triple: Option<TriplePattern>,
    conditions: Vec<TriplePattern>,
    order: IndexMap<Variable, bool>,
    distinct: bool,
    counting: bool,
    keyword_search: bool,
}

impl QueryModel {
    /// Create an empty query model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query model scoped to a related resource whose predicate
    /// names are resolved by `resolver`
    pub fn with_resolver(resolver: Arc<dyn PredicateResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::default()
        }
    }

    /// Append projected variables
    pub fn add_binding_variables(&mut self, vars: impl IntoIterator<Item = Variable>) -> &mut Self {
        self.bindings.extend(vars);
        self
    }

    /// Count the distinct values of one variable instead of returning rows.
    ///
    /// The variable is also projected; the count is taken client-side over
    /// the distinct decoded rows.
    pub fn add_counting_variable(&mut self, var: impl Into<Term>) -> RdfQueryResult<&mut Self> {
        let var = match var.into() {
            Term::Variable(v) => v,
            other => {
                return Err(RdfQueryError::Type(format!(
                    "can only count unbound variables, got {other}"
                )))
            }
        };
        if self.counting {
            return Err(RdfQueryError::Type(
                "cannot count more than one variable".to_string(),
            ));
        }
        self.counting = true;
        self.bindings.push(var);
        Ok(self)
    }

    /// Project a single triple instead of variables (native backends only).
    /// Replaces any previous binding triple.
    pub fn add_binding_triple(
        &mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Term>,
        object: impl Into<Term>,
    ) -> &mut Self {
        self.binding_triple = Some(TriplePattern::new(subject, predicate, object));
        self
    }

    /// Append a where-clause condition, resolving a symbolic predicate
    /// through the related resource when the model has one
    pub fn add_condition(
        &mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Term>,
        object: impl Into<Term>,
    ) -> &mut Self {
        let predicate = self.resolve_predicate(predicate.into());
        let pattern = TriplePattern {
            subject: subject.into(),
            predicate,
            object: object.into(),
        };
        debug!(%pattern, "adding condition");
        self.conditions.push(pattern);
        self
    }

    /// Order by a variable; calling again for the same variable overwrites
    pub fn order_by(&mut self, var: Variable, descending: bool) -> &mut Self {
        self.order.insert(var, descending);
        self
    }

    /// Ask for distinct rows
    pub fn set_distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    /// Match literal objects by keyword instead of exact equality
    pub fn activate_keyword_search(&mut self) -> &mut Self {
        self.keyword_search = true;
        self
    }

    pub fn bindings(&self) -> &[Variable] {
        &self.bindings
    }

    pub fn binding_triple(&self) -> Option<&TriplePattern> {
        self.binding_triple.as_ref()
    }

    pub fn conditions(&self) -> &[TriplePattern] {
        &self.conditions
    }

    /// Ordered variables with their descending flag
    pub fn order(&self) -> &IndexMap<Variable, bool> {
        &self.order
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_counting(&self) -> bool {
        self.counting
    }

    pub fn is_keyword_search(&self) -> bool {
        self.keyword_search
    }

    /// Names of every variable mentioned anywhere in the model
    pub(crate) fn variable_names(&self) -> HashSet<&str> {
        let patterns = self.conditions.iter().chain(self.binding_triple.iter());
        self.bindings
            .iter()
            .chain(self.order.keys())
            .map(Variable::name)
            .chain(
                patterns
                    .flat_map(|p| p.terms())
                    .filter_map(|t| t.as_variable().map(Variable::name)),
            )
            .collect()
    }

    /// Checks shared by every generator
    pub(crate) fn validate(&self) -> RdfQueryResult<()> {
        if self.counting {
            if self.binding_triple.is_some() {
                return Err(RdfQueryError::State(
                    "counting cannot be combined with a binding triple".to_string(),
                ));
            }
            if self.bindings.len() != 1 {
                return Err(RdfQueryError::State(format!(
                    "counting needs exactly one projected variable, found {}",
                    self.bindings.len()
                )));
            }
        }
        Ok(())
    }

    /// Translate the model into the given query language
    pub fn generate(&self, language: QueryLanguage) -> RdfQueryResult<String> {
        match language {
            QueryLanguage::Sparql => SparqlGenerator::generate(self),
            QueryLanguage::Native => NativeGenerator::generate(self),
        }
    }

    /// Generate for the backend's language, run it, and decode the rows.
    ///
    /// Counting queries return the number of distinct rows.
    pub async fn execute(self, backend: &Backend) -> RdfQueryResult<QueryOutput> {
        let query = self.generate(backend.query_language())?;
        let counting = self.counting;
        drop(self);

        let rows = backend.query(&query).await?;
        if counting {
            let distinct: HashSet<&ResultRow> = rows.iter().collect();
            debug!(rows = rows.len(), distinct = distinct.len(), "counted results");
            Ok(QueryOutput::Count(distinct.len()))
        } else {
            Ok(QueryOutput::Rows(rows))
        }
    }

    fn resolve_predicate(&self, predicate: Term) -> Term {
        let Some(resolver) = &self.resolver else {
            return predicate;
        };
        if let Term::Variable(name) = &predicate {
            if let Some(uri) = resolver.resolve(name.name()) {
                return Term::Resource(uri);
            }
        }
        predicate
    }
}

impl fmt::Debug for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryModel")
            .field("bindings", &self.bindings)
            .field("binding_triple", &self.binding_triple)
            .field("conditions", &self.conditions)
            .field("order", &self.order)
            .field("distinct", &self.distinct)
            .field("counting", &self.counting)
            .field("keyword_search", &self.keyword_search)
            .finish_non_exhaustive()
    }
}
