use crate::query::error::ValidationError;
use crate::query::fields::{
    self, FIELD_COUNT, FIELD_REPO, FIELD_REV, FIELD_TIMEOUT, FIELD_TYPE,
};
use crate::query::types::{Basic, Labels, Parameter};
use regex::Regex;
use rustc_hash::FxHashMap;

/// Check a Basic query for parameter combinations the backend cannot run.
///
/// Errors are meant for the person writing the query and name the field
/// they concern.
pub fn validate(basic: &Basic) -> Result<(), ValidationError> {
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();

    for parameter in &basic.parameters {
        let count = seen.entry(parameter.field.as_str()).or_insert(0);
        *count += 1;
        if *count > 1 && fields::is_singular(&parameter.field) {
            return Err(ValidationError::Duplicate {
                field: parameter.field.clone(),
            });
        }

        if parameter.negated && !fields::is_negatable(&parameter.field) {
            return Err(ValidationError::NotNegatable {
                field: parameter.field.clone(),
            });
        }

        validate_value(parameter)?;
    }

    validate_companions(basic)?;
    validate_patterns(basic)
}

fn validate_value(parameter: &Parameter) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidValue {
        field: parameter.field.clone(),
        value: parameter.value.clone(),
        reason,
    };
    let value = parameter.value.as_str();

    if let Some(allowed) = fields::allowed_values(&parameter.field) {
        let lower = value.to_ascii_lowercase();
        if !allowed.contains(&lower.as_str()) {
            return Err(invalid(format!("expected one of {}", allowed.join(", "))));
        }
        return Ok(());
    }

    match parameter.field.as_str() {
        FIELD_COUNT => match value.parse::<u32>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(invalid("expected a positive integer".to_string())),
        },
        FIELD_TIMEOUT => humantime::parse_duration(value)
            .map(|_| ())
            .map_err(|e| invalid(e.to_string())),
        FIELD_REPO => {
            // repo:name@revision
            let pattern = value.split_once('@').map(|(name, _)| name).unwrap_or(value);
            Regex::new(pattern).map(|_| ()).map_err(|e| invalid(e.to_string()))
        }
        field if fields::is_regexp_valued(field) => {
            Regex::new(value).map(|_| ()).map_err(|e| invalid(e.to_string()))
        }
        _ => Ok(()),
    }
}

fn validate_companions(basic: &Basic) -> Result<(), ValidationError> {
    let commit_search = basic
        .find_parameter(FIELD_TYPE)
        .map(|p| matches!(p.value.to_ascii_lowercase().as_str(), "commit" | "diff"))
        .unwrap_or(false);

    if let Some(p) = basic
        .parameters
        .iter()
        .find(|p| fields::is_commit_only(&p.field))
    {
        if !commit_search {
            return Err(ValidationError::MissingCompanion {
                field: p.field.clone(),
                requires: "type:commit or type:diff".to_string(),
            });
        }
    }

    if basic.find_parameter(FIELD_REV).is_some() {
        let mut repos = basic.parameters_named(FIELD_REPO).filter(|p| !p.negated).peekable();
        if repos.peek().is_none() {
            return Err(ValidationError::MissingCompanion {
                field: FIELD_REV.to_string(),
                requires: "a repo: parameter".to_string(),
            });
        }
        if repos.any(|p| p.value.contains('@')) {
            return Err(ValidationError::Conflict {
                field: FIELD_REV.to_string(),
                other: "a repo:name@revision parameter".to_string(),
            });
        }
    }

    Ok(())
}

fn validate_patterns(basic: &Basic) -> Result<(), ValidationError> {
    for pattern in basic.patterns() {
        let labels = pattern.annotation.labels;
        if !labels.is_set(Labels::REGEXP) || labels.is_set(Labels::QUOTED) {
            continue;
        }
        if let Err(e) = Regex::new(&pattern.value) {
            return Err(ValidationError::InvalidPattern {
                pattern: pattern.value.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(())
}
