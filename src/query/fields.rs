//! Recognized parameter fields and the rules attached to them.

pub const FIELD_REPO: &str = "repo";
pub const FIELD_REPOGROUP: &str = "repogroup";
pub const FIELD_FILE: &str = "file";
pub const FIELD_LANG: &str = "lang";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_CASE: &str = "case";
pub const FIELD_PATTERN_TYPE: &str = "patterntype";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_REPO_HAS_FILE: &str = "repohasfile";
pub const FIELD_REPO_HAS_COMMIT_AFTER: &str = "repohascommitafter";
pub const FIELD_BEFORE: &str = "before";
pub const FIELD_AFTER: &str = "after";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_COMMITTER: &str = "committer";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_FORK: &str = "fork";
pub const FIELD_ARCHIVED: &str = "archived";
pub const FIELD_COUNT: &str = "count";
pub const FIELD_TIMEOUT: &str = "timeout";
pub const FIELD_VISIBILITY: &str = "visibility";
pub const FIELD_REV: &str = "rev";
pub const FIELD_INDEX: &str = "index";
pub const FIELD_SELECT: &str = "select";

const FIELDS: &[&str] = &[
    FIELD_REPO,
    FIELD_REPOGROUP,
    FIELD_FILE,
    FIELD_LANG,
    FIELD_TYPE,
    FIELD_CASE,
    FIELD_PATTERN_TYPE,
    FIELD_CONTENT,
    FIELD_REPO_HAS_FILE,
    FIELD_REPO_HAS_COMMIT_AFTER,
    FIELD_BEFORE,
    FIELD_AFTER,
    FIELD_AUTHOR,
    FIELD_COMMITTER,
    FIELD_MESSAGE,
    FIELD_FORK,
    FIELD_ARCHIVED,
    FIELD_COUNT,
    FIELD_TIMEOUT,
    FIELD_VISIBILITY,
    FIELD_REV,
    FIELD_INDEX,
    FIELD_SELECT,
];

const ALIASES: &[(&str, &str)] = &[
    ("r", FIELD_REPO),
    ("g", FIELD_REPOGROUP),
    ("f", FIELD_FILE),
    ("l", FIELD_LANG),
    ("language", FIELD_LANG),
    ("since", FIELD_AFTER),
    ("until", FIELD_BEFORE),
    ("m", FIELD_MESSAGE),
    ("msg", FIELD_MESSAGE),
    ("revision", FIELD_REV),
];

/// Resolve a field name (case-insensitive, aliases allowed) to its canonical form
pub fn resolve_field(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    if let Some(field) = FIELDS.iter().find(|f| **f == lower) {
        return Some(*field);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, field)| *field)
}

/// Fields that may appear at most once per query
pub fn is_singular(field: &str) -> bool {
    matches!(
        field,
        FIELD_ARCHIVED
            | FIELD_CASE
            | FIELD_CONTENT
            | FIELD_COUNT
            | FIELD_FORK
            | FIELD_INDEX
            | FIELD_PATTERN_TYPE
            | FIELD_REPO_HAS_COMMIT_AFTER
            | FIELD_TIMEOUT
            | FIELD_TYPE
            | FIELD_VISIBILITY
            | FIELD_SELECT
    )
}

pub fn is_negatable(field: &str) -> bool {
    !matches!(
        field,
        FIELD_ARCHIVED
            | FIELD_CASE
            | FIELD_COUNT
            | FIELD_FORK
            | FIELD_INDEX
            | FIELD_PATTERN_TYPE
            | FIELD_REPOGROUP
            | FIELD_TIMEOUT
            | FIELD_TYPE
            | FIELD_VISIBILITY
            | FIELD_REV
            | FIELD_SELECT
    )
}

/// Fields whose value is a regular expression
pub fn is_regexp_valued(field: &str) -> bool {
    matches!(
        field,
        FIELD_REPO | FIELD_FILE | FIELD_REPO_HAS_FILE | FIELD_MESSAGE | FIELD_AUTHOR | FIELD_COMMITTER
    )
}

/// Fields whose value is a path glob when the globbing dialect is on
pub fn is_glob_valued(field: &str) -> bool {
    matches!(field, FIELD_REPO | FIELD_FILE | FIELD_REPO_HAS_FILE)
}

/// Fields only meaningful for commit and diff searches
pub fn is_commit_only(field: &str) -> bool {
    matches!(
        field,
        FIELD_BEFORE | FIELD_AFTER | FIELD_AUTHOR | FIELD_COMMITTER | FIELD_MESSAGE
    )
}

/// Closed value domain of a field, if it has one
pub fn allowed_values(field: &str) -> Option<&'static [&'static str]> {
    match field {
        FIELD_CASE => Some(&["yes", "no"]),
        FIELD_FORK | FIELD_ARCHIVED | FIELD_INDEX => Some(&["yes", "no", "only"]),
        FIELD_PATTERN_TYPE => Some(&["literal", "regexp", "regex"]),
        FIELD_TYPE => Some(&["commit", "diff", "symbol", "repo", "path", "file"]),
        FIELD_VISIBILITY => Some(&["any", "public", "private"]),
        FIELD_SELECT => Some(&["repo", "file", "content", "symbol", "commit"]),
        _ => None,
    }
}
