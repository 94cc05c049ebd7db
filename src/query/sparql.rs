//! SPARQL SELECT generation

use super::{QueryLanguage, QueryModel};
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::{Literal, Term};
use std::fmt::Write;

/// Translates a [`QueryModel`] into a single-line SPARQL SELECT query
pub struct SparqlGenerator;

impl SparqlGenerator {
    /// Generate the query string.
    ///
    /// Projection is expressed only through binding variables, so binding
    /// triples and counting are rejected.
    pub fn generate(model: &QueryModel) -> RdfQueryResult<String> {
        if model.binding_triple().is_some() {
            return Err(unsupported("binding triples"));
        }
        if model.is_counting() {
            return Err(unsupported("counting"));
        }
        model.validate()?;

        let mut query = String::from("SELECT ");
        if model.is_distinct() {
            query.push_str("DISTINCT ");
        }
        if model.bindings().is_empty() {
            query.push('*');
        } else {
            let vars: Vec<String> = model.bindings().iter().map(|v| v.to_string()).collect();
            query.push_str(&vars.join(" "));
        }

        query.push_str(" WHERE {");
        let mut keywords = KeywordVariables::new(model);
        let mut filters = Vec::new();
        for condition in model.conditions() {
            let object = match &condition.object {
                Term::Literal(lit) if model.is_keyword_search() => {
                    let var = keywords.next();
                    filters.push(regex_filter(&var, lit));
                    var
                }
                other => other.to_string(),
            };
            let _ = write!(query, " {} {} {} .", condition.subject, condition.predicate, object);
        }
        for filter in filters {
            let _ = write!(query, " {}", filter);
        }
        query.push_str(" }");

        if !model.order().is_empty() {
            let keys: Vec<String> = model
                .order()
                .iter()
                .map(|(var, descending)| {
                    if *descending {
                        format!("DESC({})", var)
                    } else {
                        format!("ASC({})", var)
                    }
                })
                .collect();
            let _ = write!(query, " ORDER BY {}", keys.join(" "));
        }

        Ok(query)
    }
}

fn unsupported(feature: &str) -> RdfQueryError {
    RdfQueryError::UnsupportedFeature {
        language: QueryLanguage::Sparql,
        feature: feature.to_string(),
    }
}

/// Case-insensitive substring match on the lexical form of `var`
fn regex_filter(var: &str, keyword: &Literal) -> String {
    let pattern = Literal::new_simple_literal(regex::escape(keyword.value()));
    format!("FILTER regex(str({}), {}, \"i\")", var, pattern)
}

/// Fresh `?kwN` names that do not clash with the model's own variables
struct KeywordVariables<'a> {
    taken: std::collections::HashSet<&'a str>,
    next: usize,
}

impl<'a> KeywordVariables<'a> {
    fn new(model: &'a QueryModel) -> Self {
        Self {
            taken: model.variable_names(),
            next: 0,
        }
    }

    fn next(&mut self) -> String {
        loop {
            let name = format!("kw{}", self.next);
            self.next += 1;
            if !self.taken.contains(name.as_str()) {
                return format!("?{}", name);
            }
        }
    }
}
