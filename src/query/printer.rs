use crate::query::fields;
use crate::query::partition::partition_search_pattern;
use crate::query::types::{Basic, Kind, Labels, Node, Parameter, Pattern};
use crate::utils::quote;

/// Render nodes back into query text that parses to an equivalent tree.
///
/// Used where a parsed query is edited as a tree and shown to the user
/// again, so the output keeps the user's shape where it can:
///
/// - `repo:foo file:bar a and b` stays as is; no `and` is inserted between
///   parameters.
/// - parameters come first, then the pattern expression.
/// - whitespace, keyword case and grouping parentheses may change.
///
/// When the nodes cannot be split into parameters and a single pattern
/// expression, each operator is rendered as a parenthesized group of its
/// operands, each operand rendered compactly on its own.
pub fn string_human(nodes: &[Node]) -> String {
    match partition_search_pattern(nodes) {
        Ok(basic) => basic.string_human(),
        Err(_) => nodes
            .iter()
            .map(string_human_node)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn string_human_node(node: &Node) -> String {
    match node {
        Node::Operator(op) => {
            let operands: Vec<String> = op
                .operands
                .iter()
                .map(|operand| string_human(std::slice::from_ref(operand)))
                .collect();
            format!("({})", operands.join(&format!(" {} ", op.kind.keyword())))
        }
        leaf => string_human(std::slice::from_ref(leaf)),
    }
}

impl Basic {
    /// Render as `params pattern`, see [`string_human`]
    pub fn string_human(&self) -> String {
        let parameters = self
            .parameters
            .iter()
            .map(human_parameter)
            .collect::<Vec<_>>()
            .join(" ");

        match &self.pattern {
            None => parameters,
            Some(pattern) if parameters.is_empty() => human_pattern(pattern, true),
            Some(pattern) => format!("{} {}", parameters, human_pattern(pattern, true)),
        }
    }
}

/// Render a pattern expression. A top-level `and` needs no parentheses;
/// every other operator is grouped.
fn human_pattern(node: &Node, top_level: bool) -> String {
    match node {
        Node::Pattern(p) => human_pattern_leaf(p),
        Node::Parameter(p) => human_parameter(p),
        Node::Operator(op) => {
            let operands: Vec<String> = op.operands.iter().map(|o| human_pattern(o, false)).collect();
            let joined = operands.join(&format!(" {} ", op.kind.keyword()));
            if top_level && op.kind == Kind::And {
                joined
            } else {
                format!("({})", joined)
            }
        }
    }
}

fn human_pattern_leaf(pattern: &Pattern) -> String {
    let value = if pattern.annotation.labels.is_set(Labels::QUOTED)
        || pattern_needs_quoting(&pattern.value)
    {
        quote(&pattern.value)
    } else {
        pattern.value.clone()
    };

    if pattern.negated {
        format!("(not {})", value)
    } else {
        value
    }
}

fn human_parameter(parameter: &Parameter) -> String {
    let value = if parameter.annotation.labels.is_set(Labels::QUOTED)
        || value_needs_quoting(&parameter.value)
    {
        quote(&parameter.value)
    } else {
        parameter.value.clone()
    };

    if parameter.negated {
        format!("-{}:{}", parameter.field, value)
    } else {
        format!("{}:{}", parameter.field, value)
    }
}

/// True if the scanner would not read `value` back as one bare value
fn value_needs_quoting(value: &str) -> bool {
    if value.is_empty() || value.starts_with('"') {
        return true;
    }

    let mut depth = 0usize;
    for ch in value.chars() {
        if ch.is_whitespace() {
            return true;
        }
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => return true,
            ')' => depth -= 1,
            _ => {}
        }
    }
    false
}

/// Like [`value_needs_quoting`], plus anything a bare pattern would be
/// mistaken for: a group, a keyword or a parameter.
fn pattern_needs_quoting(value: &str) -> bool {
    if value_needs_quoting(value) || value.starts_with('(') {
        return true;
    }
    if ["and", "or", "not"].iter().any(|k| starts_with_keyword(value, k)) {
        return true;
    }

    let body = value.strip_prefix('-').unwrap_or(value);
    match body.split_once(':') {
        Some((name, _)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphabetic())
                && fields::resolve_field(name).is_some()
        }
        None => false,
    }
}

/// `and(x)` reads as the keyword followed by a group
fn starts_with_keyword(value: &str, keyword: &str) -> bool {
    if value.len() < keyword.len() || !value.is_char_boundary(keyword.len()) {
        return false;
    }
    let (head, tail) = value.split_at(keyword.len());
    head.eq_ignore_ascii_case(keyword) && matches!(tail.chars().next(), None | Some('(') | Some(')'))
}

/// Structural rendering of a node list, one s-expression per node
pub fn structural(nodes: &[Node]) -> String {
    nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::{parse, ParserOptions};

    fn human(input: &str) -> String {
        string_human(&parse(input, &ParserOptions::default()).unwrap())
    }

    #[test]
    fn test_parameters_then_pattern() {
        assert_eq!(human("repo:foo file:bar a and b"), "repo:foo file:bar a and b");
    }

    #[test]
    fn test_parameters_moved_before_patterns() {
        assert_eq!(human("a repo:foo"), "repo:foo a");
    }

    #[test]
    fn test_implicit_and_rendered_explicitly() {
        assert_eq!(human("a b"), "a and b");
    }

    #[test]
    fn test_pattern_or_grouped() {
        assert_eq!(human("a or b"), "(a or b)");
        assert_eq!(human("repo:foo (a or b)"), "repo:foo (a or b)");
    }

    #[test]
    fn test_negation() {
        assert_eq!(human("not a"), "(not a)");
        assert_eq!(human("-repo:foo -file:bar x"), "-repo:foo -file:bar x");
    }

    #[test]
    fn test_quoting_restored() {
        assert_eq!(human(r#"repo:"my repo" "hello world""#), r#"repo:"my repo" "hello world""#);
        assert_eq!(human(r#""single""#), r#""single""#);
    }

    #[test]
    fn test_fallback_for_mixed_or() {
        assert_eq!(human("repo:a or repo:b"), "(repo:a or repo:b)");
        assert_eq!(human("a (b or repo:x)"), "(a and (b or repo:x))");
        assert_eq!(human("repo:x a or repo:y b"), "(repo:x a or repo:y b)");
    }

    #[test]
    fn test_unsafe_values_quoted() {
        let basic = Basic {
            parameters: vec![Parameter::new("file", "a b")],
            pattern: Node::and(vec![
                Node::pattern("or"),
                Node::pattern("(x"),
                Node::pattern("repo:y"),
                Node::pattern("plain"),
            ]),
        };
        assert_eq!(
            basic.string_human(),
            r#"file:"a b" "or" and "(x" and "repo:y" and plain"#
        );
    }

    #[test]
    fn test_keyword_prefixed_token_quoted() {
        let basic = Basic {
            parameters: vec![],
            pattern: Some(Node::pattern("not(x)")),
        };
        assert_eq!(basic.string_human(), r#""not(x)""#);
        assert_eq!(human("android"), "android");
    }

    #[test]
    fn test_structural() {
        let nodes = parse("repo:foo a", &ParserOptions::default()).unwrap();
        assert_eq!(structural(&nodes), r#"(and "repo:foo" "a")"#);
    }

    #[test]
    fn test_empty() {
        assert_eq!(string_human(&[]), "");
    }
}
