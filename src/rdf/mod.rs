//! RDF node model and embedded triple store
//!
//! - [`Term`] / [`TriplePattern`]: query-side values, any position may be a
//!   [`Variable`]
//! - [`Triple`] / [`TripleStore`]: concrete data held by the local backend
//! - [`Node`] / [`ResultRow`]: decoded query results
//!
//! # Example
//!
//! ```rust
//! use rdfquery::rdf::{TripleStore, Triple, NamedNode, Literal};
//!
//! let mut store = TripleStore::new();
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! store.insert(Triple::new(subject.clone(), predicate, Literal::new_simple_literal("Alice"))).unwrap();
//!
//! assert_eq!(store.predicates_of(&subject.into()).len(), 1);
//! ```

mod ntriples;
mod store;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, Node, RdfError, RdfObject, RdfResult, RdfSubject,
    ResultRow, Term, Triple, TriplePattern, Variable,
};

pub use store::{TripleStore, TripleStoreError, TripleStoreResult};

pub use ntriples::load_ntriples;
