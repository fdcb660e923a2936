use serde_json::Value;
use validator::{ValidationError, ValidationErrors};

/// Renders field errors as sentences, e.g.
/// "admin_password must be at least 6 characters".
pub fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter()
                .map(move |err| describe_one(&field, err))
                .collect::<Vec<_>>()
        })
        .collect();
    if messages.is_empty() {
        return "Invalid input".to_string();
    }
    messages.sort();
    messages.join("; ")
}

fn describe_one(field: &str, err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return format!("{field} {message}");
    }
    let min = err.params.get("min").and_then(Value::as_u64);
    let max = err.params.get("max").and_then(Value::as_u64);
    match &*err.code {
        "length" => {
            let len = err
                .params
                .get("value")
                .and_then(Value::as_str)
                .map(|s| s.chars().count() as u64);
            match (min, max, len) {
                (Some(min), _, Some(len)) if len < min => {
                    format!("{field} must be at least {min} characters")
                }
                (_, Some(max), Some(len)) if len > max => {
                    format!("{field} must be at most {max} characters")
                }
                (Some(min), Some(max), _) => {
                    format!("{field} must be between {min} and {max} characters")
                }
                (Some(min), None, _) => format!("{field} must be at least {min} characters"),
                (None, Some(max), _) => format!("{field} must be at most {max} characters"),
                (None, None, _) => format!("{field} has an invalid length"),
            }
        }
        "email" => format!("{field} must be a valid email address"),
        "range" => match (min, max) {
            (Some(min), Some(max)) => format!("{field} must be between {min} and {max}"),
            (Some(min), None) => format!("{field} must be at least {min}"),
            (None, Some(max)) => format!("{field} must be at most {max}"),
            (None, None) => format!("{field} is out of range"),
        },
        _ => format!("{field} is invalid"),
    }
}
