use crate::utils::quote;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Syntactic flags attached to a leaf.
///
/// Labels only steer how a leaf is rendered back to query text. Evaluation
/// never looks at them.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(u8);

impl Labels {
    pub const NONE: Labels = Labels(0);
    /// Pattern is matched as a literal string
    pub const LITERAL: Labels = Labels(1);
    /// Pattern is matched as a regular expression
    pub const REGEXP: Labels = Labels(1 << 1);
    /// Value was written between double quotes
    pub const QUOTED: Labels = Labels(1 << 2);
    /// Pattern absorbed parentheses that are not grouping (`foo(bar)`)
    pub const PARENS_AS_PATTERN: Labels = Labels(1 << 3);

    const NAMES: [(Labels, &'static str); 4] = [
        (Labels::LITERAL, "Literal"),
        (Labels::REGEXP, "Regexp"),
        (Labels::QUOTED, "Quoted"),
        (Labels::PARENS_AS_PATTERN, "ParensAsPattern"),
    ];

    pub fn is_set(self, other: Labels) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Labels) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: Labels) {
        self.0 &= !other.0;
    }
}

impl BitOr for Labels {
    type Output = Labels;

    fn bitor(self, rhs: Labels) -> Labels {
        Labels(self.0 | rhs.0)
    }
}

impl fmt::Debug for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(label, _)| self.is_set(*label))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Byte range of a leaf in the original query text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

/// Rendering metadata carried by every leaf
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub labels: Labels,
    pub range: Range,
}

/// A search pattern leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub value: String,
    pub negated: bool,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Pattern {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            negated: false,
            annotation: Annotation::default(),
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.annotation.labels = labels;
        self
    }
}

/// A `field:value` leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub field: String,
    pub value: String,
    pub negated: bool,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Parameter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            negated: false,
            annotation: Annotation::default(),
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.annotation.labels = labels;
        self
    }
}

/// Boolean operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    And,
    Or,
}

impl Kind {
    pub fn keyword(self) -> &'static str {
        match self {
            Kind::And => "and",
            Kind::Or => "or",
        }
    }
}

/// Boolean operator over at least two operands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub kind: Kind,
    pub operands: Vec<Node>,
}

impl Operator {
    /// Build an operator, flattening nested operators of the same kind.
    ///
    /// A single remaining operand is returned as is and an empty operand
    /// list yields `None`, so the result never holds fewer than two operands.
    pub fn reduce(kind: Kind, operands: Vec<Node>) -> Option<Node> {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Node::Operator(op) if op.kind == kind => flat.extend(op.operands),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Node::Operator(Operator {
                kind,
                operands: flat,
            })),
        }
    }
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Pattern(Pattern),
    Parameter(Parameter),
    Operator(Operator),
}

impl Node {
    pub fn pattern(value: impl Into<String>) -> Self {
        Node::Pattern(Pattern::new(value))
    }

    pub fn parameter(field: impl Into<String>, value: impl Into<String>) -> Self {
        Node::Parameter(Parameter::new(field, value))
    }

    pub fn and(operands: Vec<Node>) -> Option<Self> {
        Operator::reduce(Kind::And, operands)
    }

    pub fn or(operands: Vec<Node>) -> Option<Self> {
        Operator::reduce(Kind::Or, operands)
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Node::Operator(_))
    }

    pub fn is_negated(&self) -> bool {
        match self {
            Node::Pattern(p) => p.negated,
            Node::Parameter(p) => p.negated,
            Node::Operator(_) => false,
        }
    }

    /// True if every leaf below this node is a pattern
    pub fn is_pattern_expression(&self) -> bool {
        match self {
            Node::Pattern(_) => true,
            Node::Parameter(_) => false,
            Node::Operator(op) => op.operands.iter().all(Node::is_pattern_expression),
        }
    }

    /// True if an operator of `kind` appears anywhere in this subtree
    pub fn contains_kind(&self, kind: Kind) -> bool {
        match self {
            Node::Operator(op) => {
                op.kind == kind || op.operands.iter().any(|o| o.contains_kind(kind))
            }
            _ => false,
        }
    }

    /// Leaves in left-to-right, depth-first order
    pub fn leaves(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self {
            Node::Operator(op) => op.operands.iter().for_each(|o| o.collect_leaves(out)),
            leaf => out.push(leaf),
        }
    }

    /// Operands of a top-level `and`, or the node itself
    pub fn conjuncts(&self) -> &[Node] {
        match self {
            Node::Operator(op) if op.kind == Kind::And => &op.operands,
            other => std::slice::from_ref(other),
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        match self {
            Node::Pattern(p) => Some(&p.annotation),
            Node::Parameter(p) => Some(&p.annotation),
            Node::Operator(_) => None,
        }
    }
}

impl From<Pattern> for Node {
    fn from(p: Pattern) -> Self {
        Node::Pattern(p)
    }
}

impl From<Parameter> for Node {
    fn from(p: Parameter) -> Self {
        Node::Parameter(p)
    }
}

/// Structural rendering: leaves are quoted, operators are s-expressions.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Pattern(p) => fmt::Display::fmt(p, f),
            Node::Parameter(p) => fmt::Display::fmt(p, f),
            Node::Operator(op) => {
                write!(f, "({}", op.kind.keyword())?;
                for operand in &op.operands {
                    write!(f, " {}", operand)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "(not {})", quote(&self.value))
        } else {
            write!(f, "{}", quote(&self.value))
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.negated { "-" } else { "" };
        let text = format!("{}{}:{}", prefix, self.field, self.value);
        write!(f, "{}", quote(&text))
    }
}

/// A disjunct split into its parameters and at most one pattern expression.
///
/// `pattern` only ever contains patterns and operators over patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basic {
    pub parameters: Vec<Parameter>,
    pub pattern: Option<Node>,
}

impl Basic {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.pattern.is_none()
    }

    /// First parameter with the given field
    pub fn find_parameter(&self, field: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.field == field)
    }

    pub fn parameters_named<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Parameter> + 'a {
        self.parameters.iter().filter(move |p| p.field == field)
    }

    /// Pattern leaves in order of appearance
    pub fn patterns(&self) -> Vec<&Pattern> {
        self.pattern
            .as_ref()
            .map(|node| {
                node.leaves()
                    .into_iter()
                    .filter_map(|leaf| match leaf {
                        Node::Pattern(p) => Some(p),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parameters followed by the pattern expression
    pub fn to_nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.parameters.iter().cloned().map(Node::Parameter).collect();
        if let Some(pattern) = &self.pattern {
            nodes.push(pattern.clone());
        }
        nodes
    }

    /// The Basic as a single conjunction
    pub fn to_node(&self) -> Option<Node> {
        Node::and(self.to_nodes())
    }
}

impl fmt::Display for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
        if let Some(pattern) = &self.pattern {
            parts.push(pattern.to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}
