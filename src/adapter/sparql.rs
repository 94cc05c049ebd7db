//! SparqlAdapter: HTTP client for a remote SPARQL endpoint
//!
//! Queries are sent as `GET <url>?query=<percent-encoded>` with an `Accept`
//! header matching the configured result format.

use super::config::{ResultFormat, SparqlConfig};
use super::json::decode_json;
use super::xml::{decode_xml_async, XmlReadError};
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::ResultRow;
use futures::TryStreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

/// Backend talking to a SPARQL endpoint over HTTP
#[derive(Debug, Clone)]
pub struct SparqlAdapter {
    config: SparqlConfig,
    http_client: Client,
}

impl SparqlAdapter {
    /// Create an adapter for the configured endpoint.
    ///
    /// No request is made until the first query.
    pub fn new(config: SparqlConfig) -> RdfQueryResult<Self> {
        if config.url.trim().is_empty() {
            return Err(RdfQueryError::Config("SPARQL endpoint URL is empty".to_string()));
        }
        let http_client = Client::builder()
            .build()
            .map_err(|e| RdfQueryError::Config(e.to_string()))?;
        info!(
            url = %config.url,
            engine = ?config.engine,
            format = config.result_format.name(),
            "SPARQL adapter ready"
        );
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &SparqlConfig {
        &self.config
    }

    /// Endpoint URL named in transport errors
    pub fn endpoint(&self) -> &str {
        &self.config.url
    }

    /// Full request URL for a query string
    pub fn request_url(&self, query: &str) -> String {
        let query = if self.config.strips_distinct() {
            strip_select_distinct(query)
        } else {
            query.to_string()
        };
        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}query={}",
            self.config.url,
            separator,
            utf8_percent_encode(&query, NON_ALPHANUMERIC)
        )
    }

    /// Run a query and collect every row
    pub async fn query(&self, query: &str) -> RdfQueryResult<Vec<ResultRow>> {
        let mut rows = Vec::new();
        self.query_with(query, |row| rows.push(row)).await?;
        Ok(rows)
    }

    /// Run a query, handing each row to `on_row` as soon as it is decoded.
    /// Returns the number of rows.
    pub async fn query_with<F>(&self, query: &str, mut on_row: F) -> RdfQueryResult<usize>
    where
        F: FnMut(ResultRow),
    {
        let url = self.request_url(query);
        let format = self.config.result_format;
        debug!(endpoint = %self.config.url, %query, "sending SPARQL query");

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, format.accept_header())
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.config.url, error = %e, "SPARQL request failed");
                RdfQueryError::unavailable(&self.config.url, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %self.config.url, %status, "SPARQL endpoint returned an error");
            return Err(RdfQueryError::unavailable(
                &self.config.url,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        let count = match format {
            ResultFormat::Json => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| RdfQueryError::unavailable(&self.config.url, e))?;
                let rows = decode_json(&body)?;
                let count = rows.len();
                rows.into_iter().for_each(&mut on_row);
                count
            }
            ResultFormat::Xml | ResultFormat::SparqlXml => {
                let stream = response.bytes_stream().map_err(std::io::Error::other);
                let reader = StreamReader::new(Box::pin(stream));
                decode_xml_async(reader, &mut on_row)
                    .await
                    .map_err(|e| match e {
                        XmlReadError::Io(reason) => {
                            RdfQueryError::unavailable(&self.config.url, reason)
                        }
                        XmlReadError::Malformed(reason) => {
                            RdfQueryError::decode(format.name(), reason)
                        }
                    })?
            }
        };

        debug!(endpoint = %self.config.url, rows = count, "SPARQL query complete");
        Ok(count)
    }
}

/// Drop the `DISTINCT` modifier of the leading `SELECT`, leaving the rest
/// of the query (literals and IRIs included) untouched
fn strip_select_distinct(query: &str) -> String {
    fn keyword<'a>(text: &'a str, word: &str) -> Option<&'a str> {
        let head = text.get(..word.len())?;
        let rest = &text[word.len()..];
        (head.eq_ignore_ascii_case(word) && rest.starts_with(char::is_whitespace)).then_some(rest)
    }

    let body = query.trim_start();
    let Some(after_select) = keyword(body, "SELECT") else {
        return query.to_string();
    };
    let modifier = after_select.trim_start();
    match keyword(modifier, "DISTINCT") {
        Some(rest) => {
            let select_end = query.len() - after_select.len();
            format!("{} {}", &query[..select_end], rest.trim_start())
        }
        None => query.to_string(),
    }
}
