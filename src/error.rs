//! Error types for rdfquery

use crate::query::QueryLanguage;
use crate::rdf::{RdfError, TripleStoreError};
use thiserror::Error;

/// Errors raised while building, translating, or executing a query
#[derive(Error, Debug)]
pub enum RdfQueryError {
    /// The query model is in a state that cannot be translated
    #[error("Invalid query state: {0}")]
    State(String),

    /// An argument had the wrong shape
    #[error("Type error: {0}")]
    Type(String),

    /// The selected query language cannot express part of the model
    #[error("{language} generator does not support {feature}")]
    UnsupportedFeature {
        /// Target language
        language: QueryLanguage,
        /// Offending model feature
        feature: String,
    },

    /// Transport failure talking to a backend
    #[error("Backend {endpoint} unavailable: {reason}")]
    BackendUnavailable {
        /// Endpoint URL or store identity
        endpoint: String,
        /// Underlying cause or HTTP status
        reason: String,
    },

    /// The backend answered with a body that could not be decoded
    #[error("Could not decode {format} result: {reason}")]
    ResultDecode {
        /// Result encoding being decoded
        format: String,
        /// Decoder message
        reason: String,
    },

    /// Native query string rejected by the parser
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    /// Invalid IRI, literal, blank node, or variable
    #[error("Invalid term: {0}")]
    InvalidTerm(#[from] RdfError),

    /// Embedded store error
    #[error("Store error: {0}")]
    Store(#[from] TripleStoreError),

    /// Backend configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller cancelled the query
    #[error("Query cancelled")]
    Cancelled,
}

impl RdfQueryError {
    pub(crate) fn decode(format: impl Into<String>, reason: impl ToString) -> Self {
        RdfQueryError::ResultDecode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        RdfQueryError::BackendUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

pub type RdfQueryResult<T> = Result<T, RdfQueryError>;
