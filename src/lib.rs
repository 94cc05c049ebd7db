//! rdfquery
//!
//! Translates triple-pattern queries into backend query strings, runs them
//! against a SPARQL endpoint or an embedded triple store, and decodes the
//! results into rows of RDF nodes.
//!
//! # Layout
//!
//! - [`rdf`]: terms, triples, patterns, result rows, and the in-memory store
//! - [`query`]: the [`QueryModel`] accumulator and the SPARQL and native
//!   dialect generators
//! - [`adapter`]: backends, HTTP result decoding (JSON, streaming XML), and
//!   the local evaluator
//! - [`suggest`]: predicate co-occurrence suggestions
//!
//! ## Example Usage
//!
//! ```rust
//! use rdfquery::{Backend, LocalAdapter, QueryModel, QueryOutput};
//! use rdfquery::rdf::{Literal, NamedNode, Triple, Variable};
//!
//! # tokio_test_block(async {
//! let adapter = LocalAdapter::new();
//! let alice = NamedNode::new("http://example.org/alice").unwrap();
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! adapter
//!     .insert(Triple::new(alice, name.clone(), Literal::new_simple_literal("Alice")))
//!     .await
//!     .unwrap();
//! let backend = Backend::from(adapter);
//!
//! let s = Variable::new("s").unwrap();
//! let n = Variable::new("n").unwrap();
//! let mut model = QueryModel::new();
//! model.add_binding_variables([n.clone()]).add_condition(s, name, n);
//!
//! let output = model.execute(&backend).await.unwrap();
//! let rows = output.rows().unwrap();
//! assert_eq!(rows[0].get(0).map(|node| node.value()), Some("Alice"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod error;
pub mod query;
pub mod rdf;
pub mod suggest;

// Re-export main types for convenience
pub use adapter::{
    Backend, BackendConfig, LocalAdapter, LocalConfig, ResultFormat, SparqlAdapter,
    SparqlConfig, SparqlEngine,
};

pub use error::{RdfQueryError, RdfQueryResult};

pub use query::{
    NativeGenerator, PredicateResolver, QueryLanguage, QueryModel, QueryOutput,
    SparqlGenerator,
};

pub use rdf::{Node, ResultRow, TripleStore};

pub use suggest::{PredicateStatistics, Suggestion, SuggestionEngine};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
