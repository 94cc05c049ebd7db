//! SPARQL JSON results decoding

use super::node_from_binding;
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::ResultRow;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
struct JsonResults {
    head: JsonHead,
    #[serde(default)]
    results: Option<JsonBindings>,
}

#[derive(Deserialize)]
struct JsonHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct JsonBindings {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

/// Decode a SPARQL JSON results document into rows ordered by `head.vars`.
///
/// Variables missing from a binding object decode as absent values; a
/// `null` document decodes as no rows.
pub fn decode_json(body: &[u8]) -> RdfQueryResult<Vec<ResultRow>> {
    let parsed: Option<JsonResults> =
        serde_json::from_slice(body).map_err(|e| RdfQueryError::decode("json", e))?;
    let Some(parsed) = parsed else {
        return Ok(Vec::new());
    };
    let Some(results) = parsed.results else {
        return Ok(Vec::new());
    };

    let vars = parsed.head.vars;
    let mut rows = Vec::with_capacity(results.bindings.len());
    for mut binding in results.bindings {
        let mut row = Vec::with_capacity(vars.len());
        for var in &vars {
            let node = match binding.remove(var) {
                Some(term) => node_from_binding(
                    &term.kind,
                    term.value,
                    term.lang.as_deref(),
                    term.datatype.as_deref(),
                )
                .map_err(|reason| RdfQueryError::decode("json", reason))?,
                None => None,
            };
            row.push(node);
        }
        rows.push(ResultRow::new(row));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::Node;

    const BODY: &str = r#"{
        "head": { "vars": ["s", "name", "friend"] },
        "results": { "bindings": [
            {
                "s": { "type": "uri", "value": "http://example.org/alice" },
                "name": { "type": "literal", "value": "Alice", "xml:lang": "en" },
                "friend": { "type": "bnode", "value": "b0" }
            },
            {
                "name": { "type": "typed-literal", "value": "42",
                          "datatype": "http://www.w3.org/2001/XMLSchema#integer" },
                "s": { "type": "uri", "value": "http://example.org/bob" }
            }
        ] }
    }"#;

    #[test]
    fn test_rows_follow_header_order() {
        let rows = decode_json(BODY.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.get(0).and_then(Node::as_uri), Some("http://example.org/alice"));
        let name = first.get(1).and_then(Node::as_literal).unwrap();
        assert_eq!(name.value(), "Alice");
        assert_eq!(name.language(), Some("en"));
        assert_eq!(first.get(2), None);

        let second = &rows[1];
        assert_eq!(second.get(0).and_then(Node::as_uri), Some("http://example.org/bob"));
        let age = second.get(1).and_then(Node::as_literal).unwrap();
        assert_eq!(age.datatype().as_str(), "http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(second.len(), 3);
        assert_eq!(second.get(2), None);
    }

    #[test]
    fn test_null_and_boolean_documents() {
        assert!(decode_json(b"null").unwrap().is_empty());
        assert!(decode_json(br#"{"head": {}, "boolean": true}"#).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body() {
        let err = decode_json(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, RdfQueryError::ResultDecode { .. }));

        let bad_type = r#"{"head":{"vars":["s"]},"results":{"bindings":[{"s":{"type":"triple","value":"x"}}]}}"#;
        assert!(decode_json(bad_type.as_bytes()).is_err());
    }
}
