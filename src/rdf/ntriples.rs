//! N-Triples input for the embedded store

use super::store::{TripleStore, TripleStoreError};
use super::types::{BlankNode, Literal, NamedNode, RdfError, RdfObject, RdfSubject, Triple};
use crate::error::{RdfQueryError, RdfQueryResult};
use rio_api::model as rio;
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleError};
use std::io::BufRead;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
enum LoadError {
    #[error("{0}")]
    Syntax(#[from] TurtleError),

    #[error("{0}")]
    Term(#[from] RdfError),

    #[error("{0}")]
    Store(#[from] TripleStoreError),

    #[error("RDF-star triples are not supported")]
    QuotedTriple,
}

/// Parse N-Triples from `reader` into `store`.
///
/// Triples already present are skipped. Returns the number inserted.
pub fn load_ntriples<R: BufRead>(reader: R, store: &mut TripleStore) -> RdfQueryResult<usize> {
    let mut inserted = 0;
    let mut parser = NTriplesParser::new(reader);
    parser
        .parse_all(&mut |t: rio::Triple<'_>| -> Result<(), LoadError> {
            let triple = convert_triple(&t)?;
            if !store.contains(&triple) {
                store.insert(triple)?;
                inserted += 1;
            }
            Ok(())
        })
        .map_err(|e| RdfQueryError::decode("n-triples", e))?;

    debug!(inserted, total = store.len(), "loaded n-triples");
    Ok(inserted)
}

fn convert_triple(t: &rio::Triple<'_>) -> Result<Triple, LoadError> {
    let subject: RdfSubject = match t.subject {
        rio::Subject::NamedNode(n) => NamedNode::new(n.iri)?.into(),
        rio::Subject::BlankNode(b) => BlankNode::from_id(b.id)?.into(),
        #[allow(unreachable_patterns)]
        _ => return Err(LoadError::QuotedTriple),
    };
    let predicate = NamedNode::new(t.predicate.iri)?;
    let object: RdfObject = match t.object {
        rio::Term::NamedNode(n) => NamedNode::new(n.iri)?.into(),
        rio::Term::BlankNode(b) => BlankNode::from_id(b.id)?.into(),
        rio::Term::Literal(rio::Literal::Simple { value }) => {
            Literal::new_simple_literal(value).into()
        }
        rio::Term::Literal(rio::Literal::LanguageTaggedString { value, language }) => {
            Literal::new_language_tagged_literal(value, language)?.into()
        }
        rio::Term::Literal(rio::Literal::Typed { value, datatype }) => {
            Literal::new_typed_literal(value, NamedNode::new(datatype.iri)?).into()
        }
        #[allow(unreachable_patterns)]
        _ => return Err(LoadError::QuotedTriple),
    };
    Ok(Triple::new(subject, predicate, object))
}
