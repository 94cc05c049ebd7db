//! Streaming SPARQL XML results decoding
//!
//! Rows are handed to the caller as each `<result>` element closes, so a
//! large response never has to be held in memory.

use super::node_from_binding;
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::{Node, ResultRow};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use tokio::io::AsyncBufRead;
use tracing::trace;

/// Decoding failure, split so transport problems can be told apart from
/// malformed documents
#[derive(Debug)]
pub(crate) enum XmlReadError {
    /// The underlying reader failed
    Io(String),
    /// The document is not well-formed SPARQL XML
    Malformed(String),
}

impl From<quick_xml::Error> for XmlReadError {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            quick_xml::Error::Io(io) => XmlReadError::Io(io.to_string()),
            other => XmlReadError::Malformed(other.to_string()),
        }
    }
}

struct PendingValue {
    kind: &'static str,
    lang: Option<String>,
    datatype: Option<String>,
}

/// Element-driven state of a SPARQL XML results document
#[derive(Default)]
struct SolutionsHandler {
    in_head: bool,
    variables: Vec<String>,
    row: Option<Vec<Option<Node>>>,
    binding: Option<usize>,
    value: Option<PendingValue>,
    text: String,
    rows: usize,
    complete: bool,
}

impl SolutionsHandler {
    /// Feed one event; returns `true` at end of document
    fn handle(
        &mut self,
        event: Event<'_>,
        on_row: &mut impl FnMut(ResultRow),
    ) -> Result<bool, XmlReadError> {
        match event {
            Event::Start(e) => self.start(&e)?,
            Event::Empty(e) => {
                self.start(&e)?;
                self.end(e.local_name().as_ref(), on_row)?;
            }
            Event::End(e) => self.end(e.local_name().as_ref(), on_row)?,
            Event::Text(t) if self.value.is_some() => {
                self.text.push_str(&t.unescape()?);
            }
            Event::CData(c) if self.value.is_some() => {
                let text = std::str::from_utf8(&c)
                    .map_err(|e| XmlReadError::Malformed(e.to_string()))?;
                self.text.push_str(text);
            }
            Event::Eof if self.complete => return Ok(true),
            Event::Eof => {
                return Err(XmlReadError::Malformed(
                    "document ended before </sparql>".to_string(),
                ))
            }
            _ => {}
        }
        Ok(false)
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<(), XmlReadError> {
        match e.local_name().as_ref() {
            b"head" => self.in_head = true,
            b"variable" if self.row.is_some() => {
                return Err(XmlReadError::Malformed(
                    "<variable> inside a result".to_string(),
                ));
            }
            b"variable" if self.in_head => {
                let name = required_attribute(e, b"name")?;
                self.variables.push(name);
            }
            b"result" => self.row = Some(vec![None; self.variables.len()]),
            b"binding" => {
                let name = required_attribute(e, b"name")?;
                let index = self
                    .variables
                    .iter()
                    .position(|v| *v == name)
                    .ok_or_else(|| {
                        XmlReadError::Malformed(format!("binding for undeclared variable {name}"))
                    })?;
                self.binding = Some(index);
            }
            b"uri" => self.begin_value("uri", None, None),
            b"bnode" => self.begin_value("bnode", None, None),
            b"literal" => {
                let lang = attribute(e, b"xml:lang")?;
                let datatype = attribute(e, b"datatype")?;
                self.begin_value("literal", lang, datatype);
            }
            _ => {}
        }
        Ok(())
    }

    fn begin_value(&mut self, kind: &'static str, lang: Option<String>, datatype: Option<String>) {
        self.text.clear();
        self.value = Some(PendingValue {
            kind,
            lang,
            datatype,
        });
    }

    fn end(&mut self, name: &[u8], on_row: &mut impl FnMut(ResultRow)) -> Result<(), XmlReadError> {
        match name {
            b"head" => self.in_head = false,
            b"uri" | b"bnode" | b"literal" => {
                let Some(value) = self.value.take() else {
                    return Ok(());
                };
                let text = std::mem::take(&mut self.text);
                let node = node_from_binding(
                    value.kind,
                    text,
                    value.lang.as_deref(),
                    value.datatype.as_deref(),
                )
                .map_err(XmlReadError::Malformed)?;
                if let (Some(row), Some(index)) = (self.row.as_mut(), self.binding) {
                    let slot = row.get_mut(index).ok_or_else(|| {
                        XmlReadError::Malformed(format!("binding {index} outside the result row"))
                    })?;
                    *slot = node;
                }
            }
            b"sparql" => self.complete = true,
            b"binding" => self.binding = None,
            b"result" => {
                if let Some(row) = self.row.take() {
                    self.rows += 1;
                    trace!(row = self.rows, "decoded XML result");
                    on_row(ResultRow::new(row));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XmlReadError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlReadError::Malformed(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<String, XmlReadError> {
    attribute(e, key)?.ok_or_else(|| {
        XmlReadError::Malformed(format!(
            "<{}> without {} attribute",
            String::from_utf8_lossy(e.local_name().as_ref()),
            String::from_utf8_lossy(key)
        ))
    })
}

/// Decode a SPARQL XML results document from a blocking reader, calling
/// `on_row` for each result as it completes. Returns the number of rows.
pub fn decode_xml<R: BufRead>(reader: R, mut on_row: impl FnMut(ResultRow)) -> RdfQueryResult<usize> {
    let mut reader = Reader::from_reader(reader);
    let mut handler = SolutionsHandler::default();
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| RdfQueryError::decode("xml", e))?;
        let done = handler.handle(event, &mut on_row).map_err(|e| match e {
            XmlReadError::Io(reason) | XmlReadError::Malformed(reason) => {
                RdfQueryError::decode("xml", reason)
            }
        })?;
        if done {
            break;
        }
        buf.clear();
    }
    Ok(handler.rows)
}

/// Async counterpart of [`decode_xml`] used on HTTP response bodies
pub(crate) async fn decode_xml_async<R: AsyncBufRead + Unpin>(
    reader: R,
    on_row: &mut impl FnMut(ResultRow),
) -> Result<usize, XmlReadError> {
    let mut reader = Reader::from_reader(reader);
    let mut handler = SolutionsHandler::default();
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into_async(&mut buf).await?;
        if handler.handle(event, on_row)? {
            break;
        }
        buf.clear();
    }
    Ok(handler.rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<sparql xmlns="http://www.w3.org/2005/sparql-results#">
  <head>
    <variable name="s"/>
    <variable name="label"/>
    <variable name="other"/>
  </head>
  <results>
    <result>
      <binding name="label"><literal xml:lang="en">Tom &amp; Jerry</literal></binding>
      <binding name="s"><uri>http://example.org/tom</uri></binding>
      <binding name="other"><bnode>r1</bnode></binding>
    </result>
    <result>
      <binding name="s"><uri>http://example.org/n</uri></binding>
      <binding name="label"><literal datatype="http://www.w3.org/2001/XMLSchema#integer">7</literal></binding>
    </result>
    <result>
      <binding name="label"><literal/></binding>
    </result>
  </results>
</sparql>"#;

    #[test]
    fn test_decode_document() {
        let mut rows = Vec::new();
        let count = decode_xml(DOC.as_bytes(), |row| rows.push(row)).unwrap();
        assert_eq!(count, 3);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].get(0).and_then(Node::as_uri), Some("http://example.org/tom"));
        let label = rows[0].get(1).and_then(Node::as_literal).unwrap();
        assert_eq!(label.value(), "Tom & Jerry");
        assert_eq!(label.language(), Some("en"));
        assert_eq!(rows[0].get(2), None);

        let seven = rows[1].get(1).and_then(Node::as_literal).unwrap();
        assert_eq!(seven.datatype().as_str(), "http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(rows[1].get(2), None);

        assert_eq!(rows[2].get(0), None);
        assert_eq!(rows[2].get(1).map(Node::value), Some(""));
    }

    #[test]
    fn test_undeclared_binding() {
        let doc = r#"<sparql><head><variable name="s"/></head><results>
            <result><binding name="x"><uri>http://a</uri></binding></result>
            </results></sparql>"#;
        let err = decode_xml(doc.as_bytes(), |_| {}).unwrap_err();
        assert!(matches!(err, RdfQueryError::ResultDecode { .. }));
    }

    #[test]
    fn test_variable_declared_inside_result() {
        let doc = r#"<sparql><head></head><results><result>
            <head><variable name="x"/></head>
            <binding name="x"><uri>http://a</uri></binding>
            </result></results></sparql>"#;
        let err = decode_xml(doc.as_bytes(), |_| {}).unwrap_err();
        assert!(matches!(err, RdfQueryError::ResultDecode { .. }));
    }

    #[test]
    fn test_mismatched_tags() {
        let doc = "<sparql><head></sparql>";
        assert!(decode_xml(doc.as_bytes(), |_| {}).is_err());
    }

    #[test]
    fn test_truncated_document() {
        let doc = r#"<sparql><head><variable name="s"/></head><results>
            <result><binding name="s"><uri>http://a</uri></binding></result>"#;
        let mut rows = 0;
        assert!(decode_xml(doc.as_bytes(), |_| rows += 1).is_err());
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_empty_results() {
        let doc = r#"<sparql><head><variable name="s"/></head><results/></sparql>"#;
        assert_eq!(decode_xml(doc.as_bytes(), |_| {}).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_async_matches_blocking() {
        let mut rows = Vec::new();
        let count = decode_xml_async(DOC.as_bytes(), &mut |row| rows.push(row))
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(rows[1].get(0).and_then(Node::as_uri), Some("http://example.org/n"));
    }
}
