use crate::query::dnf::dnf;
use crate::query::error::{QueryError, ValidationError};
use crate::query::fields;
use crate::query::parser::{override_search_type, parse, ParserOptions};
use crate::query::partition::partition_search_pattern;
use crate::query::types::{Basic, Node};
use crate::query::validate::validate;
use crate::utils::glob_to_regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compiled query: Basic queries whose results are unioned.
///
/// Entries are independent of each other and may run in any order or
/// concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    pub basics: Vec<Basic>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.basics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Basic> {
        self.basics.iter()
    }

    /// The plan as one tree, an `or` over its entries
    pub fn to_parse_tree(&self) -> Option<Node> {
        Node::or(self.basics.iter().filter_map(Basic::to_node).collect())
    }

    /// Query text for each entry
    pub fn human_strings(&self) -> Vec<String> {
        self.basics.iter().map(Basic::string_human).collect()
    }
}

impl IntoIterator for Plan {
    type Item = Basic;
    type IntoIter = std::vec::IntoIter<Basic>;

    fn into_iter(self) -> Self::IntoIter {
        self.basics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Basic;
    type IntoIter = std::slice::Iter<'a, Basic>;

    fn into_iter(self) -> Self::IntoIter {
        self.basics.iter()
    }
}

/// Compile query text into a [`Plan`].
///
/// Parse, expand to disjunctive normal form, then partition and validate
/// each disjunct. The first failing disjunct aborts the whole compile.
/// With `options.globbing`, glob-valued parameters are translated to
/// regexes before validation.
pub fn pipeline(input: &str, options: &ParserOptions) -> Result<Plan, QueryError> {
    let mut options = *options;
    let mut nodes = parse(input, &options)?;

    // Pattern labels depend on the search type, so reparse when overridden
    let requested = override_search_type(&nodes, options.search_type);
    if requested != options.search_type {
        options.search_type = requested;
        nodes = parse(input, &options)?;
    }
    let disjuncts = dnf(&nodes);

    let mut basics = Vec::with_capacity(disjuncts.len());
    for disjunct in &disjuncts {
        let mut basic = partition_search_pattern(std::slice::from_ref(disjunct))?;
        if options.globbing {
            translate_globs(&mut basic)?;
        }
        validate(&basic)?;
        basics.push(basic);
    }

    debug!(
        "Compiled query into {} disjunct(s) ({} search type)",
        basics.len(),
        options.search_type
    );

    Ok(Plan { basics })
}

fn translate_globs(basic: &mut Basic) -> Result<(), ValidationError> {
    for parameter in basic
        .parameters
        .iter_mut()
        .filter(|p| fields::is_glob_valued(&p.field))
    {
        let regex = glob_to_regex(&parameter.value).map_err(|e| ValidationError::InvalidValue {
            field: parameter.field.clone(),
            value: parameter.value.clone(),
            reason: e.kind().to_string(),
        })?;
        parameter.value = regex;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::SearchType;
    use crate::query::types::Labels;

    fn compile(input: &str) -> Result<Plan, QueryError> {
        pipeline(input, &ParserOptions::default())
    }

    #[test]
    fn test_single_pattern() {
        let plan = compile("a").unwrap();
        assert_eq!(plan.len(), 1);
        let basic = &plan.basics[0];
        assert!(basic.parameters.is_empty());
        match &basic.pattern {
            Some(Node::Pattern(p)) => {
                assert_eq!(p.value, "a");
                assert!(!p.negated);
            }
            other => panic!("expected a single pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_parameters_and_pattern() {
        let plan = compile("repo:foo file:bar a and b").unwrap();
        assert_eq!(plan.len(), 1);
        let basic = &plan.basics[0];
        assert_eq!(basic.to_string(), r#""repo:foo" "file:bar" (and "a" "b")"#);
        assert_eq!(plan.human_strings(), vec!["repo:foo file:bar a and b"]);
    }

    #[test]
    fn test_or_splits_plan() {
        let plan = compile("a or b").unwrap();
        let entries: Vec<String> = plan.iter().map(|b| b.to_string()).collect();
        assert_eq!(entries, vec![r#""a""#, r#""b""#]);
    }

    #[test]
    fn test_mixed_or_becomes_separate_entries() {
        let plan = compile("a (b or repo:x)").unwrap();
        assert_eq!(plan.human_strings(), vec!["a and b", "repo:x a"]);
    }

    #[test]
    fn test_syntax_error_aborts() {
        assert!(matches!(compile("(a and b"), Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_validation_error_aborts_whole_plan() {
        let err = compile("a or (case:maybe b)").unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_blank_query_yields_empty_plan() {
        let plan = compile("  ").unwrap();
        assert!(plan.is_empty());
        assert!(plan.to_parse_tree().is_none());
    }

    #[test]
    fn test_pattern_type_override() {
        let plan = compile("patterntype:regexp foo.*").unwrap();
        let labels = plan.basics[0].patterns()[0].annotation.labels;
        assert!(labels.is_set(Labels::REGEXP));

        let err = compile("patterntype:regexp foo(").unwrap_err();
        assert!(matches!(err, QueryError::Validation(ValidationError::InvalidPattern { .. })));
    }

    #[test]
    fn test_quoted_pattern_type_keeps_literal_search() {
        for input in [
            "\"a patterntype:regexp\" foo(",
            "repo:\"x patterntype:regexp\" foo(",
        ] {
            let plan = compile(input).unwrap();
            let patterns = plan.basics[0].patterns();
            let last = patterns.last().unwrap();
            assert_eq!(last.value, "foo(");
            assert!(last.annotation.labels.is_set(Labels::LITERAL));
        }
    }

    #[test]
    fn test_globbing_non_ascii_value() {
        let options = ParserOptions {
            search_type: SearchType::Literal,
            globbing: true,
        };
        let plan = pipeline("file:café/*.rs x", &options).unwrap();
        let re = regex::Regex::new(&plan.basics[0].parameters[0].value).unwrap();
        assert!(re.is_match("café/a.rs"));
        assert!(!re.is_match("cafe/a.rs"));
    }

    #[test]
    fn test_globbing_translates_values() {
        let options = ParserOptions {
            search_type: SearchType::Literal,
            globbing: true,
        };
        let plan = pipeline("file:src/*.rs x", &options).unwrap();
        let value = &plan.basics[0].parameters[0].value;
        let re = regex::Regex::new(value).unwrap();
        assert!(re.is_match("src/lib.rs"));
        assert!(!re.is_match("src/query/mod.rs"));

        let err = pipeline("file:a[ x", &options).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Validation(ValidationError::InvalidValue { ref field, .. }) if field == "file"
        ));
    }

    #[test]
    fn test_to_parse_tree() {
        let plan = compile("repo:x (a or b)").unwrap();
        assert_eq!(
            plan.to_parse_tree().unwrap().to_string(),
            r#"(or (and "repo:x" "a") (and "repo:x" "b"))"#
        );
    }
}
