//! Native triple-pattern dialect generation
//!
//! ```text
//! select [distinct] ?a ?b | select { s p o } | select *
//! where
//!   s p o .
//!   s p ~"keyword" .
//! [order by ?a desc, ?b asc]
//! ```

use super::QueryModel;
use crate::error::{RdfQueryError, RdfQueryResult};
use crate::rdf::{Literal, Term};
use std::fmt::Write;

/// Translates a [`QueryModel`] into the native pattern dialect
pub struct NativeGenerator;

impl NativeGenerator {
    /// Generate the query string
    pub fn generate(model: &QueryModel) -> RdfQueryResult<String> {
        if !model.bindings().is_empty() && model.binding_triple().is_some() {
            return Err(RdfQueryError::State(
                "cannot combine a binding triple with binding variables".to_string(),
            ));
        }
        model.validate()?;

        let mut query = String::from("select ");
        if model.is_distinct() {
            query.push_str("distinct ");
        }
        match model.binding_triple() {
            Some(triple) => {
                let _ = write!(query, "{{ {} }}", triple);
            }
            None if model.bindings().is_empty() => query.push('*'),
            None => {
                let vars: Vec<String> = model.bindings().iter().map(|v| v.to_string()).collect();
                query.push_str(&vars.join(" "));
            }
        }

        query.push_str("\nwhere");
        for condition in model.conditions() {
            let object = match &condition.object {
                Term::Literal(lit) if model.is_keyword_search() => {
                    format!("~{}", Literal::new_simple_literal(lit.value()))
                }
                other => other.to_string(),
            };
            let _ = write!(
                query,
                "\n  {} {} {} .",
                condition.subject, condition.predicate, object
            );
        }

        if !model.order().is_empty() {
            let keys: Vec<String> = model
                .order()
                .iter()
                .map(|(var, descending)| {
                    format!("{} {}", var, if *descending { "desc" } else { "asc" })
                })
                .collect();
            let _ = write!(query, "\norder by {}", keys.join(", "));
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{NamedNode, Variable};

    fn var(name: &str) -> Variable {
        Variable::new(name).unwrap()
    }

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    #[test]
    fn test_select_variables() {
        let mut model = QueryModel::new();
        model
            .add_binding_variables([var("s")])
            .add_condition(
                var("s"),
                iri("http://protege.stanford.edu/rdfknows"),
                iri("http://protege.stanford.edu/rdftest_set_Instance_9"),
            )
            .set_distinct()
            .order_by(var("s"), true);

        assert_eq!(
            NativeGenerator::generate(&model).unwrap(),
            "select distinct ?s\n\
             where\n  \
             ?s <http://protege.stanford.edu/rdfknows> <http://protege.stanford.edu/rdftest_set_Instance_9> .\n\
             order by ?s desc"
        );
    }

    #[test]
    fn test_binding_triple_projection() {
        let mut model = QueryModel::new();
        model
            .add_binding_triple(var("s"), iri("http://example.org/p"), var("o"))
            .add_condition(var("s"), iri("http://example.org/p"), var("o"));

        assert_eq!(
            NativeGenerator::generate(&model).unwrap(),
            "select { ?s <http://example.org/p> ?o }\nwhere\n  ?s <http://example.org/p> ?o ."
        );
    }

    #[test]
    fn test_rejects_bindings_with_binding_triple() {
        let mut model = QueryModel::new();
        model
            .add_binding_variables([var("s")])
            .add_binding_triple(var("s"), var("p"), var("o"));
        assert!(matches!(
            NativeGenerator::generate(&model),
            Err(RdfQueryError::State(_))
        ));
    }

    #[test]
    fn test_keyword_marker() {
        let mut model = QueryModel::new();
        model
            .add_binding_variables([var("s")])
            .add_condition(
                var("s"),
                iri("http://example.org/name"),
                Literal::new_language_tagged_literal("ren", "en").unwrap(),
            )
            .activate_keyword_search();

        assert_eq!(
            NativeGenerator::generate(&model).unwrap(),
            "select ?s\nwhere\n  ?s <http://example.org/name> ~\"ren\" ."
        );
    }

    #[test]
    fn test_counting_renders_single_projection() {
        let mut model = QueryModel::new();
        model
            .add_counting_variable(var("s"))
            .unwrap()
            .add_condition(var("s"), var("p"), var("o"))
            .order_by(var("o"), false);

        assert_eq!(
            NativeGenerator::generate(&model).unwrap(),
            "select ?s\nwhere\n  ?s ?p ?o .\norder by ?o asc"
        );
    }
}
