//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::{AppError, FieldError};

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
            })
        })
        .collect();

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Run `validator` rules on a decoded payload
pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(validation_error)
}

/// Parse a positive numeric identifier from a query parameter.
///
/// Empty, non-numeric and zero values are all rejected.
pub fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Parse a comma-separated list of positive identifiers.
///
/// Returns `None` if any element is malformed.
pub fn parse_id_list(raw: &str) -> Option<Vec<i64>> {
    raw.split(',')
        .map(|part| parse_id(Some(part)))
        .collect::<Option<Vec<_>>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("5"), Some(5) ; "numeric")]
    #[test_case(Some(" 12 "), Some(12) ; "surrounding whitespace")]
    #[test_case(Some("abc"), None ; "non numeric")]
    #[test_case(Some("0"), None ; "zero")]
    #[test_case(Some("-3"), None ; "negative")]
    #[test_case(Some(""), None ; "empty")]
    #[test_case(None, None ; "missing")]
    fn test_parse_id(raw: Option<&str>, expected: Option<i64>) {
        assert_eq!(parse_id(raw), expected);
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list("7"), Some(vec![7]));
        assert_eq!(parse_id_list("1,x"), None);
        assert_eq!(parse_id_list("1,,2"), None);
    }
}
