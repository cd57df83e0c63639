//! Template data validation and default data.
//!
//! Pure functions over the static descriptors; no I/O, no shared state.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::content::descriptor::{ContentTemplate, FieldDescriptor, FieldKind};
use crate::content::registry::field_pattern;

/// Outcome of [`validate_template_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Validate submitted data against `template`.
///
/// Required fields must be present and non-blank. Bounds apply to string
/// length (in characters), list length, or numeric magnitude for `Number`
/// fields. Patterns are tested against string values.
pub fn validate_template_data(template: &ContentTemplate, data: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    for &id in &template.required_fields {
        if is_blank(data.get(id)) {
            let label = template.field(id).map(|f| f.label).unwrap_or(id);
            errors.push(format!("{label} is required"));
        }
    }

    for field in &template.fields {
        let Some(value) = data.get(field.id) else {
            continue;
        };
        if is_blank(Some(value)) {
            continue;
        }
        check_field(field, value, &mut errors);
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn check_field(field: &FieldDescriptor, value: &Value, errors: &mut Vec<String>) {
    let label = field.label;

    if field.kind == FieldKind::Number {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(number) = number else {
            errors.push(format!("{label} must be a number"));
            return;
        };
        if let Some(rules) = &field.validation {
            if let Some(min) = rules.min.filter(|min| number < *min) {
                errors.push(format!("{label} must be at least {min}"));
            }
            if let Some(max) = rules.max.filter(|max| number > *max) {
                errors.push(format!("{label} must be at most {max}"));
            }
        }
        return;
    }

    if field.kind == FieldKind::Select && !field.options.is_empty() {
        let chosen = value.as_str().unwrap_or_default();
        if !field.options.iter().any(|option| *option == chosen) {
            errors.push(format!(
                "{label} must be one of: {}",
                field.options.join(", ")
            ));
        }
    }

    let Some(rules) = &field.validation else {
        return;
    };

    let (length, unit) = match value {
        Value::String(s) => (s.chars().count(), "characters"),
        Value::Array(items) => (items.len(), "items"),
        _ => return,
    };
    // Lengths are whole numbers; the descriptor stores them as f64.
    let length = length as f64;
    if let Some(min) = rules.min.filter(|min| length < *min) {
        errors.push(format!("{label} must be at least {min} {unit}"));
    }
    if let Some(max) = rules.max.filter(|max| length > *max) {
        errors.push(format!("{label} must be no more than {max} {unit}"));
    }

    if let (Some(pattern), Value::String(s)) = (rules.pattern, value) {
        match field_pattern(pattern) {
            Some(re) if !re.is_match(s) => errors.push(format!("{label} format is invalid")),
            Some(_) => {}
            None => tracing::warn!(field = field.id, "Field pattern unavailable"),
        }
    }
}

/// Starting data for a new item of `template`.
pub fn default_template_data(template: &ContentTemplate) -> Value {
    let data: Map<String, Value> = template
        .fields
        .iter()
        .map(|field| {
            let value = field
                .default_value
                .clone()
                .unwrap_or_else(|| empty_value(field.kind));
            (field.id.to_string(), value)
        })
        .collect();
    Value::Object(data)
}

fn empty_value(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Number => json!(0),
        FieldKind::Boolean => json!(false),
        FieldKind::List => json!([]),
        _ => json!(""),
    }
}
