//! RDF type definitions
//!
//! Thin wrappers around the oxrdf primitives, plus the pattern-level
//! [`Term`] (which may be an unbound [`Variable`]) and the decoded result
//! value [`Node`].

use oxrdf::{
    BlankNode as OxBlankNode,
    Literal as OxLiteral,
    NamedNode as OxNamedNode,
    Variable as OxVariable,
};
use std::fmt;
use thiserror::Error;

/// RDF errors
#[derive(Error, Debug)]
pub enum RdfError {
    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Invalid blank node
    #[error("Invalid blank node: {0}")]
    InvalidBlankNode(String),

    /// Invalid literal
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// Invalid variable name
    #[error("Invalid variable name: {0}")]
    InvalidVariable(String),
}

pub type RdfResult<T> = Result<T, RdfError>;

/// Named node (IRI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

impl NamedNode {
    /// Create a new named node from an IRI string
    pub fn new(iri: &str) -> RdfResult<Self> {
        OxNamedNode::new(iri)
            .map(Self)
            .map_err(|e| RdfError::InvalidIri(format!("{iri}: {e}")))
    }

    /// Get the IRI string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OxNamedNode> for NamedNode {
    fn from(node: OxNamedNode) -> Self {
        Self(node)
    }
}

/// Blank node (anonymous node)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

impl BlankNode {
    /// Create a new blank node with a unique identifier
    pub fn new() -> Self {
        Self(OxBlankNode::default())
    }

    /// Create a blank node from a string identifier
    pub fn from_id(id: &str) -> RdfResult<Self> {
        OxBlankNode::new(id)
            .map(Self)
            .map_err(|e| RdfError::InvalidBlankNode(format!("{id}: {e}")))
    }

    /// Get the blank node identifier
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RDF literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

impl Literal {
    /// Create a simple literal (plain string)
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// Create a literal with language tag
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> RdfResult<Self> {
        OxLiteral::new_language_tagged_literal(value, language)
            .map(Self)
            .map_err(|e| RdfError::InvalidLiteral(e.to_string()))
    }

    /// Create a typed literal
    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Get the datatype
    pub fn datatype(&self) -> NamedNode {
        NamedNode(self.0.datatype().into_owned())
    }
}

impl fmt::Display for Literal {
    /// N-Triples form: `"v"`, `"v"@en` or `"v"^^<dt>`, with escaping.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an unbound query slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable(OxVariable);

impl Variable {
    /// Create a variable; the name must be a valid SPARQL variable name
    pub fn new(name: &str) -> RdfResult<Self> {
        OxVariable::new(name)
            .map(Self)
            .map_err(|e| RdfError::InvalidVariable(format!("{name}: {e}")))
    }

    /// Variable name without the leading `?`
    pub fn name(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name())
    }
}

/// RDF subject (NamedNode or BlankNode)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfSubject {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
}

impl fmt::Display for RdfSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfSubject::NamedNode(n) => write!(f, "{}", n),
            RdfSubject::BlankNode(b) => write!(f, "{}", b),
        }
    }
}

impl From<NamedNode> for RdfSubject {
    fn from(node: NamedNode) -> Self {
        RdfSubject::NamedNode(node)
    }
}

impl From<BlankNode> for RdfSubject {
    fn from(node: BlankNode) -> Self {
        RdfSubject::BlankNode(node)
    }
}

/// RDF object (NamedNode, BlankNode, or Literal)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfObject {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
    /// Literal value
    Literal(Literal),
}

impl RdfObject {
    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, RdfObject::Literal(_))
    }

    /// View this value as a subject, if it can be one
    pub fn as_subject(&self) -> Option<RdfSubject> {
        match self {
            RdfObject::NamedNode(n) => Some(RdfSubject::NamedNode(n.clone())),
            RdfObject::BlankNode(b) => Some(RdfSubject::BlankNode(b.clone())),
            RdfObject::Literal(_) => None,
        }
    }
}

impl fmt::Display for RdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfObject::NamedNode(n) => write!(f, "{}", n),
            RdfObject::BlankNode(b) => write!(f, "{}", b),
            RdfObject::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<NamedNode> for RdfObject {
    fn from(node: NamedNode) -> Self {
        RdfObject::NamedNode(node)
    }
}

impl From<BlankNode> for RdfObject {
    fn from(node: BlankNode) -> Self {
        RdfObject::BlankNode(node)
    }
}

impl From<Literal> for RdfObject {
    fn from(lit: Literal) -> Self {
        RdfObject::Literal(lit)
    }
}

impl From<RdfSubject> for RdfObject {
    fn from(subject: RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => RdfObject::NamedNode(n),
            RdfSubject::BlankNode(b) => RdfObject::BlankNode(b),
        }
    }
}

/// RDF triple (subject-predicate-object)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    /// Subject
    pub subject: RdfSubject,
    /// Predicate
    pub predicate: NamedNode,
    /// Object
    pub object: RdfObject,
}

impl Triple {
    /// Create a new triple
    pub fn new(subject: impl Into<RdfSubject>, predicate: NamedNode, object: impl Into<RdfObject>) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A position in a triple pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Unbound variable (also used for symbolic predicate names)
    Variable(Variable),
    /// URI resource
    Resource(NamedNode),
    /// Literal value
    Literal(Literal),
    /// Blank node
    BlankNode(BlankNode),
}

impl Term {
    /// The variable, if this term is one
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Concrete value of this term, `None` for variables
    pub fn to_object(&self) -> Option<RdfObject> {
        match self {
            Term::Variable(_) => None,
            Term::Resource(n) => Some(RdfObject::NamedNode(n.clone())),
            Term::Literal(l) => Some(RdfObject::Literal(l.clone())),
            Term::BlankNode(b) => Some(RdfObject::BlankNode(b.clone())),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{}", v),
            Term::Resource(n) => write!(f, "{}", n),
            Term::Literal(l) => write!(f, "{}", l),
            Term::BlankNode(b) => write!(f, "{}", b),
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Variable(v)
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::Resource(node)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<RdfObject> for Term {
    fn from(object: RdfObject) -> Self {
        match object {
            RdfObject::NamedNode(n) => Term::Resource(n),
            RdfObject::BlankNode(b) => Term::BlankNode(b),
            RdfObject::Literal(l) => Term::Literal(l),
        }
    }
}

/// Triple pattern; any position may be a variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    /// Subject
    pub subject: Term,
    /// Predicate
    pub predicate: Term,
    /// Object
    pub object: Term,
}

impl TriplePattern {
    /// Create a new triple pattern
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Positions in subject, predicate, object order
    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A decoded result value.
///
/// Blank nodes have no `Node` form: they are reported as an absent value
/// in a [`ResultRow`], so their identity is not preserved across rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// URI resource
    Resource(NamedNode),
    /// Literal value (datatype and language retained)
    Literal(Literal),
}

impl Node {
    /// Classify a stored value; blank nodes map to `None`
    pub fn from_object(object: RdfObject) -> Option<Self> {
        match object {
            RdfObject::NamedNode(n) => Some(Node::Resource(n)),
            RdfObject::Literal(l) => Some(Node::Literal(l)),
            RdfObject::BlankNode(_) => None,
        }
    }

    /// The IRI, if this is a resource
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Node::Resource(n) => Some(n.as_str()),
            Node::Literal(_) => None,
        }
    }

    /// The literal, if this is one
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            Node::Resource(_) => None,
        }
    }

    /// IRI or lexical value
    pub fn value(&self) -> &str {
        match self {
            Node::Resource(n) => n.as_str(),
            Node::Literal(l) => l.value(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Resource(n) => write!(f, "{}", n),
            Node::Literal(l) => write!(f, "{}", l),
        }
    }
}

/// One result row, aligned with the projected variables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResultRow(Vec<Option<Node>>);

impl ResultRow {
    /// Wrap decoded values
    pub fn new(values: Vec<Option<Node>>) -> Self {
        Self(values)
    }

    /// Value at a projection position
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.0.get(index).and_then(|v| v.as_ref())
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no positions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over positions
    pub fn iter(&self) -> impl Iterator<Item = Option<&Node>> {
        self.0.iter().map(|v| v.as_ref())
    }

    /// Take the values out
    pub fn into_values(self) -> Vec<Option<Node>> {
        self.0
    }
}
