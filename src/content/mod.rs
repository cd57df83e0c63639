//! Content template registry.
//!
//! Static schemas for the authorable content types (courses, packages,
//! donation campaigns, landing pages, testimonials). The CMS editor renders
//! forms from them and submissions are validated against them.
//!
//! # Data Flow
//! ```text
//! registry.rs (static descriptors, built once)
//!     → lookup by id / by type
//!     → validation.rs (required, bounds, pattern, options)
//!     → ValidationReport { valid, errors }
//! ```

pub mod descriptor;
pub mod registry;
pub mod validation;

pub use descriptor::{ContentTemplate, FieldDescriptor, FieldKind, FieldValidation, TemplateKind};
pub use registry::{all_templates, template_by_id, templates_by_kind};
pub use validation::{default_template_data, validate_template_data, ValidationReport};
