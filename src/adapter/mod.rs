//! Result adapters
//!
//! A [`Backend`] accepts query strings in its declared [`QueryLanguage`] and
//! decodes the answers into [`ResultRow`]s:
//!
//! - [`SparqlAdapter`] sends SPARQL to a remote endpoint over HTTP and
//!   decodes JSON or XML results
//! - [`LocalAdapter`] evaluates the native dialect against an embedded
//!   [`TripleStore`](crate::rdf::TripleStore)

mod config;
mod json;
mod local;
mod sparql;
mod xml;

pub use config::{BackendConfig, LocalConfig, ResultFormat, SparqlConfig, SparqlEngine};
pub use json::decode_json;
pub use local::LocalAdapter;
pub use sparql::SparqlAdapter;
pub use xml::decode_xml;

use crate::error::{RdfQueryError, RdfQueryResult};
use crate::query::{QueryLanguage, QueryModel};
use crate::rdf::{load_ntriples, Literal, NamedNode, Node, ResultRow, TripleStore, Variable};
use std::fs::File;
use std::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A query backend
#[derive(Debug, Clone)]
pub enum Backend {
    /// Remote SPARQL endpoint
    Sparql(SparqlAdapter),
    /// Embedded triple store
    Local(LocalAdapter),
}

impl Backend {
    /// Build a backend from its configuration, loading local data if any
    pub fn from_config(config: BackendConfig) -> RdfQueryResult<Self> {
        match config {
            BackendConfig::Sparql(sparql) => Ok(Backend::Sparql(SparqlAdapter::new(sparql)?)),
            BackendConfig::Local(local) => {
                let mut store = TripleStore::new();
                if let Some(path) = &local.data {
                    let file = File::open(path).map_err(|e| {
                        RdfQueryError::Config(format!("cannot read {}: {}", path.display(), e))
                    })?;
                    let added = load_ntriples(BufReader::new(file), &mut store)?;
                    info!(path = %path.display(), triples = added, "loaded local data");
                }
                Ok(Backend::Local(LocalAdapter::from_store(store)))
            }
        }
    }

    /// Language this backend accepts
    pub fn query_language(&self) -> QueryLanguage {
        match self {
            Backend::Sparql(_) => QueryLanguage::Sparql,
            Backend::Local(_) => QueryLanguage::Native,
        }
    }

    /// Run a query and collect the rows
    pub async fn query(&self, query: &str) -> RdfQueryResult<Vec<ResultRow>> {
        match self {
            Backend::Sparql(adapter) => adapter.query(query).await,
            Backend::Local(adapter) => adapter.query(query).await,
        }
    }

    /// Run a query, handing each row to `on_row` as it is decoded
    pub async fn query_with<F>(&self, query: &str, on_row: F) -> RdfQueryResult<usize>
    where
        F: FnMut(ResultRow),
    {
        match self {
            Backend::Sparql(adapter) => adapter.query_with(query, on_row).await,
            Backend::Local(adapter) => adapter.query_with(query, on_row).await,
        }
    }

    /// Run a query unless `token` is cancelled first.
    ///
    /// Cancellation drops the in-flight request.
    pub async fn query_cancellable(
        &self,
        query: &str,
        token: &CancellationToken,
    ) -> RdfQueryResult<Vec<ResultRow>> {
        let mut rows = Vec::new();
        self.query_with_cancellable(query, token, |row| rows.push(row))
            .await?;
        Ok(rows)
    }

    /// Streaming form of [`Backend::query_cancellable`]. Rows already handed
    /// to `on_row` stay delivered; decoding stops at the next await point
    /// after `token` fires and the response body is dropped.
    pub async fn query_with_cancellable<F>(
        &self,
        query: &str,
        token: &CancellationToken,
        on_row: F,
    ) -> RdfQueryResult<usize>
    where
        F: FnMut(ResultRow),
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("query cancelled");
                Err(RdfQueryError::Cancelled)
            }
            count = self.query_with(query, on_row) => count,
        }
    }

    /// Number of triples the backend exposes
    pub async fn size(&self) -> RdfQueryResult<usize> {
        if let Backend::Local(adapter) = self {
            return Ok(adapter.len().await);
        }
        let (s, p, o) = (Variable::new("s")?, Variable::new("p")?, Variable::new("o")?);
        let mut model = QueryModel::new();
        model
            .add_binding_variables([s.clone(), p.clone(), o.clone()])
            .add_condition(s, p, o);
        let output = model.execute(self).await?;
        Ok(output.rows().map_or(0, <[ResultRow]>::len))
    }
}

impl From<SparqlAdapter> for Backend {
    fn from(adapter: SparqlAdapter) -> Self {
        Backend::Sparql(adapter)
    }
}

impl From<LocalAdapter> for Backend {
    fn from(adapter: LocalAdapter) -> Self {
        Backend::Local(adapter)
    }
}

/// Classify one bound value of a results document.
///
/// `kind` is the SPARQL results value type (`uri`, `literal`,
/// `typed-literal`, `bnode`). Blank nodes decode as absent.
pub(crate) fn node_from_binding(
    kind: &str,
    value: String,
    lang: Option<&str>,
    datatype: Option<&str>,
) -> Result<Option<Node>, String> {
    match kind {
        "uri" => NamedNode::new(&value)
            .map(|n| Some(Node::Resource(n)))
            .map_err(|e| e.to_string()),
        "literal" | "typed-literal" => {
            let literal = match (lang, datatype) {
                (Some(lang), _) => {
                    Literal::new_language_tagged_literal(value, lang).map_err(|e| e.to_string())?
                }
                (None, Some(datatype)) => {
                    let datatype = NamedNode::new(datatype).map_err(|e| e.to_string())?;
                    Literal::new_typed_literal(value, datatype)
                }
                (None, None) => Literal::new_simple_literal(value),
            };
            Ok(Some(Node::Literal(literal)))
        }
        "bnode" => Ok(None),
        other => Err(format!("unknown value type {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::Triple;

    #[test]
    fn test_node_from_binding() {
        let uri = node_from_binding("uri", "http://a.example/x".into(), None, None).unwrap();
        assert_eq!(uri.as_ref().and_then(Node::as_uri), Some("http://a.example/x"));

        let typed = node_from_binding(
            "typed-literal",
            "1".into(),
            None,
            Some("http://www.w3.org/2001/XMLSchema#integer"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            typed.as_literal().map(|l| l.datatype()),
            Some(NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap())
        );

        assert_eq!(node_from_binding("bnode", "b1".into(), None, None).unwrap(), None);
        assert!(node_from_binding("uri", "not an iri".into(), None, None).is_err());
        assert!(node_from_binding("quoted", "x".into(), None, None).is_err());
    }

    #[test]
    fn test_query_languages() {
        let local = Backend::from_config(BackendConfig::Local(LocalConfig::default())).unwrap();
        assert_eq!(local.query_language(), QueryLanguage::Native);

        let sparql = Backend::from(SparqlAdapter::new(SparqlConfig::new("http://localhost/sparql")).unwrap());
        assert_eq!(sparql.query_language(), QueryLanguage::Sparql);
    }

    #[test]
    fn test_missing_data_file() {
        let config = BackendConfig::Local(LocalConfig {
            data: Some("/definitely/not/here.nt".into()),
        });
        assert!(matches!(Backend::from_config(config), Err(RdfQueryError::Config(_))));
    }

    #[tokio::test]
    async fn test_local_size() {
        let adapter = LocalAdapter::new();
        adapter
            .insert(Triple::new(
                NamedNode::new("http://a.example/s").unwrap(),
                NamedNode::new("http://a.example/p").unwrap(),
                Literal::new_simple_literal("o"),
            ))
            .await
            .unwrap();
        assert_eq!(Backend::from(adapter).size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = Backend::from(LocalAdapter::new());
        let token = CancellationToken::new();
        token.cancel();
        let result = backend.query_cancellable("select * where", &token).await;
        assert!(matches!(result, Err(RdfQueryError::Cancelled)));
    }
}
