use crate::query::error::SyntaxError;
use crate::query::fields::{self, FIELD_PATTERN_TYPE};
use crate::query::types::{Annotation, Kind, Labels, Node, Operator, Parameter, Pattern, Range};
use crate::utils::scan_quoted;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How bare patterns are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Literal,
    #[serde(alias = "regex")]
    Regexp,
}

impl SearchType {
    fn label(self) -> Labels {
        match self {
            SearchType::Literal => Labels::LITERAL,
            SearchType::Regexp => Labels::REGEXP,
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal" => Ok(SearchType::Literal),
            "regexp" | "regex" => Ok(SearchType::Regexp),
            other => Err(format!("unknown pattern type: {}", other)),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Literal => write!(f, "literal"),
            SearchType::Regexp => write!(f, "regexp"),
        }
    }
}

/// Options fixed for the duration of one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    pub search_type: SearchType,
    /// Treat `repo:`, `file:` and `repohasfile:` values as globs
    pub globbing: bool,
}

impl ParserOptions {
    pub fn new(search_type: SearchType) -> Self {
        Self {
            search_type,
            globbing: false,
        }
    }
}

type Result<T> = std::result::Result<T, SyntaxError>;

/// Search type requested by the first non-negated `patterntype:` parameter
/// in `nodes`, or `default`
pub fn override_search_type(nodes: &[Node], default: SearchType) -> SearchType {
    fn find(node: &Node) -> Option<SearchType> {
        match node {
            Node::Parameter(p) if p.field == FIELD_PATTERN_TYPE && !p.negated => {
                p.value.parse().ok()
            }
            Node::Operator(op) => op.operands.iter().find_map(find),
            _ => None,
        }
    }

    nodes.iter().find_map(find).unwrap_or(default)
}

/// Parse query text into a node tree.
///
/// Blank input yields no nodes; anything else yields exactly one root.
/// `and` binds tighter than `or`, adjacent terms are conjoined, and only
/// pattern and parameter leaves can be negated.
pub fn parse(input: &str, options: &ParserOptions) -> Result<Vec<Node>> {
    let mut parser = QueryParser::new(input, options);
    parser.parse()
}

/// Query parser
struct QueryParser<'a> {
    input: &'a str,
    pos: usize,
    options: &'a ParserOptions,
}

impl<'a> QueryParser<'a> {
    fn new(input: &'a str, options: &'a ParserOptions) -> Self {
        Self {
            input,
            pos: 0,
            options,
        }
    }

    fn parse(&mut self) -> Result<Vec<Node>> {
        self.skip_whitespace();
        if self.is_eof() {
            return Ok(Vec::new());
        }

        let root = self.parse_or()?;

        self.skip_whitespace();
        if !self.is_eof() {
            // parse_or only stops early on a closing paren
            return Err(SyntaxError::new("unbalanced parentheses: unexpected ')'", self.pos));
        }

        Ok(vec![root])
    }

    fn parse_or(&mut self) -> Result<Node> {
        let start = self.pos;
        let mut operands = vec![self.parse_and(None)?];

        loop {
            self.skip_whitespace();
            if !self.consume_keyword("or") {
                break;
            }
            operands.push(self.parse_and(Some("or"))?);
        }

        Operator::reduce(Kind::Or, operands)
            .ok_or_else(|| SyntaxError::new("expected expression", start))
    }

    fn parse_and(&mut self, after: Option<&str>) -> Result<Node> {
        let start = self.pos;
        let mut operands = Vec::new();

        loop {
            self.skip_whitespace();
            if self.at_expression_end() {
                break;
            }

            if self.peek_keyword("and") {
                let keyword_pos = self.pos;
                if operands.is_empty() {
                    return Err(SyntaxError::new(
                        "operator 'and' is missing a left operand",
                        keyword_pos,
                    ));
                }
                self.consume_keyword("and");
                self.skip_whitespace();
                if self.at_expression_end() || self.peek_keyword("and") {
                    return Err(SyntaxError::new("expected operand after 'and'", keyword_pos));
                }
                continue;
            }

            operands.push(self.parse_unary()?);
        }

        if operands.is_empty() {
            let message = match after {
                Some(keyword) => format!("expected operand after '{}'", keyword),
                None if self.peek_keyword("or") => {
                    "operator 'or' is missing a left operand".to_string()
                }
                None if self.peek_char() == Some(')') => "empty parenthesized expression".to_string(),
                None => "expected expression".to_string(),
            };
            return Err(SyntaxError::new(message, start.max(self.pos)));
        }

        Operator::reduce(Kind::And, operands)
            .ok_or_else(|| SyntaxError::new("expected expression", start))
    }

    fn parse_unary(&mut self) -> Result<Node> {
        if !self.peek_keyword("not") {
            return self.parse_primary();
        }

        let keyword_pos = self.pos;
        self.consume_keyword("not");
        self.skip_whitespace();

        if self.at_expression_end() || self.peek_keyword("and") {
            return Err(SyntaxError::new("expected operand after 'not'", keyword_pos));
        }
        if self.peek_char() == Some('(') {
            return Err(SyntaxError::new(
                "'not' applies only to patterns and parameters, not to a parenthesized expression",
                keyword_pos,
            ));
        }

        match self.parse_unary()? {
            Node::Pattern(p) => Ok(Node::Pattern(p.negate())),
            Node::Parameter(p) => Ok(Node::Parameter(p.negate())),
            Node::Operator(_) => Err(SyntaxError::new(
                "'not' applies only to patterns and parameters",
                keyword_pos,
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<Node> {
        // Parenthesized expression
        if self.peek_char() == Some('(') {
            let open = self.pos;
            self.advance();
            let node = self.parse_or()?;
            self.skip_whitespace();
            if !self.consume_char(')') {
                return Err(SyntaxError::new("unbalanced parentheses: missing ')'", open));
            }
            return Ok(node);
        }

        // Quoted pattern
        if self.peek_char() == Some('"') {
            return self.parse_quoted_pattern();
        }

        // Field parameter or bare pattern
        self.parse_term()
    }

    fn parse_quoted_pattern(&mut self) -> Result<Node> {
        let start = self.pos;
        let (value, used) = scan_quoted(self.remaining())
            .ok_or_else(|| SyntaxError::new("unterminated quoted string", start))?;
        self.pos += used;

        Ok(Node::Pattern(Pattern {
            value,
            negated: false,
            annotation: Annotation {
                labels: Labels::LITERAL | Labels::QUOTED,
                range: Range {
                    start,
                    end: self.pos,
                },
            },
        }))
    }

    fn parse_term(&mut self) -> Result<Node> {
        let start = self.pos;

        if let Some((field, negated, value_start)) = self.scan_field_prefix() {
            self.pos = value_start;
            return self.parse_field(field, negated, start);
        }

        let (value, had_parens) = self.scan_bare();
        let mut labels = self.options.search_type.label();
        if had_parens {
            labels.set(Labels::PARENS_AS_PATTERN);
        }

        Ok(Node::Pattern(Pattern {
            value,
            negated: false,
            annotation: Annotation {
                labels,
                range: Range {
                    start,
                    end: self.pos,
                },
            },
        }))
    }

    fn parse_field(&mut self, field: &'static str, negated: bool, start: usize) -> Result<Node> {
        let mut labels = Labels::NONE;

        let value = if self.peek_char() == Some('"') {
            let (value, used) = scan_quoted(self.remaining()).ok_or_else(|| {
                SyntaxError::new(format!("unterminated quoted value for field '{}'", field), self.pos)
            })?;
            self.pos += used;
            labels.set(Labels::QUOTED);
            value
        } else {
            let (value, _) = self.scan_bare();
            if value.is_empty() {
                return Err(SyntaxError::new(
                    format!("field '{}' has an empty value", field),
                    start,
                ));
            }
            value
        };

        Ok(Node::Parameter(Parameter {
            field: field.to_string(),
            value,
            negated,
            annotation: Annotation {
                labels,
                range: Range {
                    start,
                    end: self.pos,
                },
            },
        }))
    }

    /// Recognize `[-]field:` for a known field. Returns the canonical field,
    /// the negation flag and the offset where the value starts.
    fn scan_field_prefix(&self) -> Option<(&'static str, bool, usize)> {
        let rest = self.remaining();
        let (negated, body) = match rest.strip_prefix('-') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        let name_len = body
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(body.len());
        if name_len == 0 || !body[name_len..].starts_with(':') {
            return None;
        }

        let field = fields::resolve_field(&body[..name_len])?;
        let consumed = usize::from(negated) + name_len + 1;
        Some((field, negated, self.pos + consumed))
    }

    /// Read a bare token. Parentheses opened inside the token belong to it;
    /// an unmatched `)` or whitespace ends it.
    fn scan_bare(&mut self) -> (String, bool) {
        let start = self.pos;
        let mut depth = 0usize;
        let mut had_parens = false;

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                break;
            }
            match ch {
                '(' => {
                    depth += 1;
                    had_parens = true;
                }
                ')' if depth == 0 => break,
                ')' => depth -= 1,
                _ => {}
            }
            self.advance();
        }

        (self.input[start..self.pos].to_string(), had_parens)
    }

    fn at_expression_end(&self) -> bool {
        self.is_eof() || self.peek_char() == Some(')') || self.peek_keyword("or")
    }

    /// Case-insensitive keyword followed by whitespace, a paren or the end
    fn peek_keyword(&self, keyword: &str) -> bool {
        let rest = self.remaining();
        if rest.len() < keyword.len() || !rest.is_char_boundary(keyword.len()) {
            return false;
        }
        let (head, tail) = rest.split_at(keyword.len());
        head.eq_ignore_ascii_case(keyword)
            && tail
                .chars()
                .next()
                .map(|c| c.is_whitespace() || c == '(' || c == ')')
                .unwrap_or(true)
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek_char().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }
}
