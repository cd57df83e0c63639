//! Content template descriptor types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

/// Authorable content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Course,
    Package,
    Donation,
    Page,
    Testimonial,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Course => "course",
            TemplateKind::Package => "package",
            TemplateKind::Donation => "donation",
            TemplateKind::Page => "page",
            TemplateKind::Testimonial => "testimonial",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown template type '{0}'")]
pub struct UnknownTemplateKind(pub String);

impl FromStr for TemplateKind {
    type Err = UnknownTemplateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "course" => Ok(TemplateKind::Course),
            "package" => Ok(TemplateKind::Package),
            "donation" => Ok(TemplateKind::Donation),
            "page" => Ok(TemplateKind::Page),
            "testimonial" => Ok(TemplateKind::Testimonial),
            _ => Err(UnknownTemplateKind(s.to_string())),
        }
    }
}

/// Editor widget / value shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    RichText,
    Number,
    Select,
    Image,
    Url,
    Boolean,
    List,
}

/// Bounds and format rule for a field.
///
/// `min`/`max` are lengths for text and list fields and magnitudes for
/// number fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
}

impl FieldDescriptor {
    pub fn new(id: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            id,
            label,
            kind,
            placeholder: None,
            default_value: None,
            options: Vec::new(),
            validation: None,
        }
    }

    pub fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn options(mut self, options: &[&'static str]) -> Self {
        self.options = options.to_vec();
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.validation.get_or_insert_with(Default::default).min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.validation.get_or_insert_with(Default::default).max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.validation.get_or_insert_with(Default::default).pattern = Some(pattern);
        self
    }
}

/// Schema of one authorable content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTemplate {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub fields: Vec<FieldDescriptor>,
    pub required_fields: Vec<&'static str>,
}

impl ContentTemplate {
    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }
}
