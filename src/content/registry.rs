//! Static content templates used by the CMS editor.
//!
//! Built once on first access and never mutated.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::content::descriptor::{ContentTemplate, FieldDescriptor, FieldKind, TemplateKind};

const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";
const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";
const URL_PATTERN: &str = r"^(https?://|/)\S+$";

static TEMPLATES: LazyLock<Vec<ContentTemplate>> = LazyLock::new(|| {
    vec![
        course_template(),
        package_template(),
        donation_template(),
        page_template(),
        testimonial_template(),
    ]
});

fn course_template() -> ContentTemplate {
    use FieldKind::*;
    ContentTemplate {
        id: "course-template",
        name: "Course",
        kind: TemplateKind::Course,
        fields: vec![
            FieldDescriptor::new("title", "Course Title", Text)
                .placeholder("e.g. Sanskrit for Beginners")
                .min(5.0)
                .max(100.0),
            FieldDescriptor::new("slug", "URL Slug", Text).pattern(SLUG_PATTERN),
            FieldDescriptor::new("shortDescription", "Short Description", Textarea).max(300.0),
            FieldDescriptor::new("description", "Full Description", RichText),
            FieldDescriptor::new("category", "Category", Select).options(&[
                "language",
                "philosophy",
                "yoga",
                "meditation",
                "scripture",
            ]),
            FieldDescriptor::new("level", "Level", Select).options(&[
                "beginner",
                "intermediate",
                "advanced",
            ]),
            FieldDescriptor::new("price", "Price", Number).min(0.0),
            FieldDescriptor::new("durationWeeks", "Duration (weeks)", Number)
                .min(1.0)
                .max(52.0),
            FieldDescriptor::new("instructor", "Instructor", Text).max(80.0),
            FieldDescriptor::new("thumbnail", "Thumbnail", Image).pattern(URL_PATTERN),
            FieldDescriptor::new("tags", "Tags", List).max(10.0),
            FieldDescriptor::new("published", "Published", Boolean).default_value(json!(false)),
        ],
        required_fields: vec!["title", "shortDescription", "category", "level"],
    }
}

fn package_template() -> ContentTemplate {
    use FieldKind::*;
    ContentTemplate {
        id: "package-template",
        name: "Course Package",
        kind: TemplateKind::Package,
        fields: vec![
            FieldDescriptor::new("name", "Package Name", Text).min(3.0).max(100.0),
            FieldDescriptor::new("tagline", "Tagline", Text).max(140.0),
            FieldDescriptor::new("courses", "Included Courses", List).min(1.0),
            FieldDescriptor::new("price", "Bundle Price", Number).min(0.0),
            FieldDescriptor::new("discountPercent", "Discount (%)", Number)
                .min(0.0)
                .max(100.0)
                .default_value(json!(0)),
            FieldDescriptor::new("heroImage", "Hero Image", Image).pattern(URL_PATTERN),
            FieldDescriptor::new("featured", "Featured", Boolean).default_value(json!(false)),
        ],
        required_fields: vec!["name", "courses", "price"],
    }
}

fn donation_template() -> ContentTemplate {
    use FieldKind::*;
    ContentTemplate {
        id: "donation-template",
        name: "Donation Campaign",
        kind: TemplateKind::Donation,
        fields: vec![
            FieldDescriptor::new("title", "Campaign Title", Text).min(5.0).max(120.0),
            FieldDescriptor::new("description", "Description", RichText),
            FieldDescriptor::new("goalAmount", "Goal Amount", Number).min(1.0),
            FieldDescriptor::new("currency", "Currency", Select)
                .options(&["USD", "EUR", "GBP", "INR"])
                .default_value(json!("USD")),
            FieldDescriptor::new("suggestedAmounts", "Suggested Amounts", List).max(6.0),
            FieldDescriptor::new("campaignEnd", "Campaign End Date", Text)
                .placeholder("YYYY-MM-DD")
                .pattern(DATE_PATTERN),
        ],
        required_fields: vec!["title", "goalAmount", "currency"],
    }
}

fn page_template() -> ContentTemplate {
    use FieldKind::*;
    ContentTemplate {
        id: "page-template",
        name: "Landing Page",
        kind: TemplateKind::Page,
        fields: vec![
            FieldDescriptor::new("title", "Page Title", Text).min(3.0).max(120.0),
            FieldDescriptor::new("slug", "URL Slug", Text).pattern(SLUG_PATTERN),
            FieldDescriptor::new("body", "Body", RichText),
            FieldDescriptor::new("metaDescription", "Meta Description", Textarea).max(160.0),
            FieldDescriptor::new("heroImage", "Hero Image", Image).pattern(URL_PATTERN),
            FieldDescriptor::new("ctaUrl", "Call to Action URL", Url).pattern(URL_PATTERN),
        ],
        required_fields: vec!["title", "slug", "body"],
    }
}

fn testimonial_template() -> ContentTemplate {
    use FieldKind::*;
    ContentTemplate {
        id: "testimonial-template",
        name: "Testimonial",
        kind: TemplateKind::Testimonial,
        fields: vec![
            FieldDescriptor::new("authorName", "Author Name", Text).max(80.0),
            FieldDescriptor::new("quote", "Quote", Textarea).min(10.0).max(500.0),
            FieldDescriptor::new("rating", "Rating", Number)
                .min(1.0)
                .max(5.0)
                .default_value(json!(5)),
            FieldDescriptor::new("course", "Course", Text),
        ],
        required_fields: vec!["authorName", "quote"],
    }
}

/// Every registered template.
pub fn all_templates() -> &'static [ContentTemplate] {
    &TEMPLATES
}

/// Every field pattern, compiled once.
static FIELD_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    TEMPLATES
        .iter()
        .flat_map(|t| &t.fields)
        .filter_map(|f| f.validation.as_ref()?.pattern)
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some((pattern, re)),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "Invalid field pattern");
                None
            }
        })
        .collect()
});

/// The compiled regex for a pattern declared by a registry field.
pub fn field_pattern(pattern: &str) -> Option<&'static Regex> {
    FIELD_PATTERNS.get(pattern)
}

pub fn template_by_id(id: &str) -> Option<&'static ContentTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

pub fn templates_by_kind(kind: TemplateKind) -> Vec<&'static ContentTemplate> {
    TEMPLATES.iter().filter(|t| t.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_kind() {
        let course = template_by_id("course-template").unwrap();
        assert_eq!(course.kind, TemplateKind::Course);
        assert!(template_by_id("missing").is_none());

        let donations = templates_by_kind(TemplateKind::Donation);
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].id, "donation-template");
    }

    #[test]
    fn test_required_fields_are_declared() {
        for template in all_templates() {
            for id in &template.required_fields {
                assert!(
                    template.field(id).is_some(),
                    "{} requires undeclared field {}",
                    template.id,
                    id
                );
            }
        }
    }

    #[test]
    fn test_unknown_pattern_is_not_compiled_on_demand() {
        assert!(field_pattern(r"^\d+$").is_none());
    }

    #[test]
    fn test_patterns_compile() {
        for template in all_templates() {
            for field in &template.fields {
                if let Some(pattern) = field.validation.as_ref().and_then(|v| v.pattern) {
                    assert!(field_pattern(pattern).is_some(), "{}.{}", template.id, field.id);
                }
            }
        }
    }
}
