//! Native dialect parser using Pest
//!
//! The embedded local backend receives the same query strings that
//! [`NativeGenerator`](super::NativeGenerator) emits and parses them here.

use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::{BlankNode, Literal, NamedNode, Term, TriplePattern, Variable};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "query/native.pest"]
struct NativeDialectParser;

/// What a native query projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every variable, in order of first appearance
    All,
    /// Listed variables
    Variables(Vec<Variable>),
    /// The three positions of a single triple
    Triple(TriplePattern),
}

/// Object position of a native pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectMatch {
    /// Exact term (or variable)
    Term(Term),
    /// Literal whose lexical form contains the keyword
    Keyword(String),
}

/// One where-clause pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: ObjectMatch,
}

/// Parsed native query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeQuery {
    pub distinct: bool,
    pub projection: Projection,
    pub patterns: Vec<NativePattern>,
    /// Variables with their descending flag, in clause order
    pub order: Vec<(Variable, bool)>,
}

/// Parse a native dialect query string
pub fn parse_native(input: &str) -> RdfQueryResult<NativeQuery> {
    let pairs = NativeDialectParser::parse(Rule::query, input)
        .map_err(|e| RdfQueryError::QuerySyntax(e.to_string()))?;

    let mut query = NativeQuery {
        distinct: false,
        projection: Projection::All,
        patterns: Vec::new(),
        order: Vec::new(),
    };

    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::select_clause => parse_select(pair, &mut query)?,
            Rule::where_clause => {
                for pattern in pair.into_inner() {
                    query.patterns.push(parse_pattern(pattern)?);
                }
            }
            Rule::order_clause => {
                for key in pair.into_inner() {
                    let mut inner = key.into_inner();
                    let var = parse_variable(next(&mut inner)?)?;
                    let descending = match inner.next().map(|d| d.as_rule()) {
                        Some(Rule::asc) => false,
                        // Unmarked keys sort descending
                        _ => true,
                    };
                    query.order.push((var, descending));
                }
            }
            _ => {}
        }
    }

    Ok(query)
}

fn parse_select(pair: Pair<'_, Rule>, query: &mut NativeQuery) -> RdfQueryResult<()> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::distinct => query.distinct = true,
            Rule::projection => {
                let items: Vec<Pair<'_, Rule>> = inner.into_inner().collect();
                query.projection = match items.first().map(|p| p.as_rule()) {
                    Some(Rule::star) | None => Projection::All,
                    Some(Rule::binding_triple) => {
                        let mut terms = items[0].clone().into_inner();
                        Projection::Triple(TriplePattern::new(
                            parse_term(next(&mut terms)?)?,
                            parse_term(next(&mut terms)?)?,
                            parse_term(next(&mut terms)?)?,
                        ))
                    }
                    Some(_) => Projection::Variables(
                        items
                            .into_iter()
                            .map(parse_variable)
                            .collect::<RdfQueryResult<_>>()?,
                    ),
                };
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_pattern(pair: Pair<'_, Rule>) -> RdfQueryResult<NativePattern> {
    let mut inner = pair.into_inner();
    let subject = parse_term(next(&mut inner)?)?;
    let predicate = parse_term(next(&mut inner)?)?;
    let object_pair = next(&mut inner)?;
    let object = match object_pair.as_rule() {
        Rule::keyword => {
            let string = next(&mut object_pair.into_inner())?;
            ObjectMatch::Keyword(parse_string(string)?)
        }
        _ => ObjectMatch::Term(parse_term(object_pair)?),
    };
    Ok(NativePattern {
        subject,
        predicate,
        object,
    })
}

fn parse_term(pair: Pair<'_, Rule>) -> RdfQueryResult<Term> {
    match pair.as_rule() {
        Rule::variable => Ok(Term::Variable(parse_variable(pair)?)),
        Rule::iri => Ok(Term::Resource(parse_iri(pair)?)),
        Rule::blank => {
            let id = next(&mut pair.into_inner())?;
            Ok(Term::BlankNode(BlankNode::from_id(id.as_str())?))
        }
        Rule::literal => {
            let mut inner = pair.into_inner();
            let value = parse_string(next(&mut inner)?)?;
            let literal = match inner.next() {
                Some(tag) if tag.as_rule() == Rule::lang_tag => {
                    let lang = next(&mut tag.into_inner())?;
                    Literal::new_language_tagged_literal(value, lang.as_str())?
                }
                Some(datatype) => {
                    let iri = next(&mut datatype.into_inner())?;
                    Literal::new_typed_literal(value, parse_iri(iri)?)
                }
                None => Literal::new_simple_literal(value),
            };
            Ok(Term::Literal(literal))
        }
        other => Err(RdfQueryError::QuerySyntax(format!("expected a term, found {other:?}"))),
    }
}

fn parse_variable(pair: Pair<'_, Rule>) -> RdfQueryResult<Variable> {
    let name = next(&mut pair.into_inner())?;
    Ok(Variable::new(name.as_str())?)
}

fn parse_iri(pair: Pair<'_, Rule>) -> RdfQueryResult<NamedNode> {
    let body = next(&mut pair.into_inner())?;
    Ok(NamedNode::new(body.as_str())?)
}

/// Unescape the body of a quoted string
fn parse_string(pair: Pair<'_, Rule>) -> RdfQueryResult<String> {
    let raw = next(&mut pair.into_inner())?.as_str();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(c @ ('u' | 'U')) => {
                let len = if c == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        RdfQueryError::QuerySyntax(format!("invalid escape \\{c}{hex}"))
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {
                return Err(RdfQueryError::QuerySyntax(
                    "dangling escape at end of string".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

fn next<'i>(pairs: &mut pest::iterators::Pairs<'i, Rule>) -> RdfQueryResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| RdfQueryError::QuerySyntax("unexpected end of clause".to_string()))
}
