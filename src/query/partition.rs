use crate::query::error::PartitionError;
use crate::query::types::{Basic, Node};

/// Split a conjunction into its parameters and one pattern expression.
///
/// `nodes` is read as a conjunction; top-level `and` operators are opened
/// up. Every operand must be a parameter or a pure pattern expression.
/// Several pattern operands are joined under one `and`. An operand that
/// mixes patterns and parameters below an operator cannot be represented
/// as a [`Basic`] and fails the partition.
pub fn partition_search_pattern(nodes: &[Node]) -> Result<Basic, PartitionError> {
    let mut parameters = Vec::new();
    let mut patterns = Vec::new();

    for node in nodes.iter().flat_map(Node::conjuncts) {
        match node {
            Node::Parameter(p) => parameters.push(p.clone()),
            n if n.is_pattern_expression() => patterns.push(n.clone()),
            other => {
                return Err(PartitionError {
                    node: other.to_string(),
                });
            }
        }
    }

    Ok(Basic {
        parameters,
        pattern: Node::and(patterns),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::{parse, ParserOptions};

    fn partition(input: &str) -> Result<Basic, PartitionError> {
        partition_search_pattern(&parse(input, &ParserOptions::default()).unwrap())
    }

    #[test]
    fn test_parameters_and_patterns_separated() {
        let basic = partition("repo:foo a file:bar b").unwrap();
        let fields: Vec<&str> = basic.parameters.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(fields, vec!["repo", "file"]);
        assert_eq!(basic.pattern.unwrap().to_string(), r#"(and "a" "b")"#);
    }

    #[test]
    fn test_single_pattern_not_wrapped() {
        let basic = partition("repo:foo a").unwrap();
        assert_eq!(basic.pattern.unwrap().to_string(), r#""a""#);
    }

    #[test]
    fn test_parameters_only() {
        let basic = partition("repo:foo -file:bar").unwrap();
        assert_eq!(basic.parameters.len(), 2);
        assert!(basic.pattern.is_none());
    }

    #[test]
    fn test_pattern_disjunction_kept() {
        let basic = partition("repo:foo (a or b)").unwrap();
        assert_eq!(basic.pattern.unwrap().to_string(), r#"(or "a" "b")"#);
    }

    #[test]
    fn test_mixed_or_fails() {
        let err = partition("a (b or repo:x)").unwrap_err();
        assert_eq!(err.node, r#"(or "b" "repo:x")"#);
    }

    #[test]
    fn test_top_level_or_of_parameters_fails() {
        assert!(partition("repo:a or repo:b").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(partition_search_pattern(&[]).unwrap().is_empty());
    }
}
