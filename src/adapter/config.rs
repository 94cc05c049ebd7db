//! Backend configuration
//!
//! Configurations are plain serde structs so they can be loaded from YAML:
//!
//! ```yaml
//! adapter: sparql
//! url: http://localhost:8080/repositories/people
//! results: sparql-xml
//! engine: sesame2
//! ```

use crate::error::{RdfQueryError, RdfQueryResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Result encoding requested from a SPARQL endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFormat {
    /// SPARQL JSON results
    #[default]
    Json,
    /// XML results negotiated as RDF/XML
    Xml,
    /// SPARQL XML results
    SparqlXml,
}

impl ResultFormat {
    /// Value of the `Accept` request header
    pub fn accept_header(&self) -> &'static str {
        match self {
            ResultFormat::Json => "application/sparql-results+json",
            ResultFormat::Xml => "application/rdf+xml",
            ResultFormat::SparqlXml => "application/sparql-results+xml",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResultFormat::Json => "json",
            ResultFormat::Xml => "xml",
            ResultFormat::SparqlXml => "sparql-xml",
        }
    }
}

impl FromStr for ResultFormat {
    type Err = RdfQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "json" => Ok(ResultFormat::Json),
            "xml" => Ok(ResultFormat::Xml),
            "sparql-xml" => Ok(ResultFormat::SparqlXml),
            other => Err(RdfQueryError::Config(format!("result format unsupported: {other}"))),
        }
    }
}

/// SPARQL server implementation behind an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparqlEngine {
    /// YARS2; rejects the DISTINCT keyword
    Yars2,
    /// Sesame 2
    #[default]
    Sesame2,
    /// Joseki
    Joseki,
    /// Virtuoso
    Virtuoso,
}

impl FromStr for SparqlEngine {
    type Err = RdfQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yars2" => Ok(SparqlEngine::Yars2),
            "sesame2" => Ok(SparqlEngine::Sesame2),
            "joseki" => Ok(SparqlEngine::Joseki),
            "virtuoso" => Ok(SparqlEngine::Virtuoso),
            other => Err(RdfQueryError::Config(format!("SPARQL engine unsupported: {other}"))),
        }
    }
}

/// Remote SPARQL endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlConfig {
    /// Endpoint URL, without the `query` parameter
    pub url: String,
    /// Requested result encoding
    #[serde(default, rename = "results")]
    pub result_format: ResultFormat,
    /// Server implementation
    #[serde(default)]
    pub engine: SparqlEngine,
    /// Remove `DISTINCT` before submitting; defaults on for YARS2
    #[serde(default)]
    pub strip_distinct: Option<bool>,
}

impl SparqlConfig {
    /// JSON results from a Sesame 2 endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            result_format: ResultFormat::default(),
            engine: SparqlEngine::default(),
            strip_distinct: None,
        }
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.result_format = format;
        self
    }

    pub fn with_engine(mut self, engine: SparqlEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Whether DISTINCT is removed from outgoing queries
    pub fn strips_distinct(&self) -> bool {
        self.strip_distinct
            .unwrap_or(self.engine == SparqlEngine::Yars2)
    }
}

/// Embedded store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// N-Triples file loaded at startup
    #[serde(default)]
    pub data: Option<PathBuf>,
}

/// Configuration of one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "adapter", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Remote SPARQL endpoint
    Sparql(SparqlConfig),
    /// Embedded triple store speaking the native dialect
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> RdfQueryResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RdfQueryError::Config(e.to_string()))
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: &Path) -> RdfQueryResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RdfQueryError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}
