//! Content template API handlers.

use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::content::{
    all_templates, default_template_data, template_by_id, templates_by_kind,
    validate_template_data, ContentTemplate, TemplateKind, ValidationReport,
};
use crate::http::error::ApiError;
use crate::security::SanitizedJson;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A passing report plus the sanitized data, ready to store.
#[derive(Debug, Serialize)]
pub struct ValidatedData {
    #[serde(flatten)]
    pub report: ValidationReport,
    pub data: Value,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/templates?type=<kind>`
pub async fn list_templates(
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<&'static ContentTemplate>>, ApiError> {
    let templates = match query.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(raw) => {
            let kind = raw
                .parse::<TemplateKind>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            templates_by_kind(kind)
        }
        None => all_templates().iter().collect(),
    };
    Ok(Json(templates))
}

/// `GET /api/templates/{id}`
pub async fn get_template(
    Path(id): Path<String>,
) -> Result<Json<&'static ContentTemplate>, ApiError> {
    find(&id).map(Json)
}

/// `GET /api/templates/{id}/defaults`
pub async fn template_defaults(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let template = find(&id)?;
    Ok(Json(default_template_data(template)))
}

/// `POST /api/templates/{id}/validate`
///
/// Rules run against the body as submitted. 200 with the report and the
/// sanitized data when valid, 422 with the report otherwise.
pub async fn validate_template(
    Path(id): Path<String>,
    body: SanitizedJson<Value>,
) -> Result<Json<ValidatedData>, ApiError> {
    let template = find(&id)?;
    let report = validate_template_data(template, &body.raw);

    tracing::debug!(
        template = template.id,
        valid = report.valid,
        errors = report.errors.len(),
        "Template data validated"
    );

    if report.valid {
        Ok(Json(ValidatedData {
            report,
            data: body.value,
        }))
    } else {
        Err(ApiError::Invalid(report))
    }
}

fn find(id: &str) -> Result<&'static ContentTemplate, ApiError> {
    template_by_id(id).ok_or_else(|| ApiError::NotFound(format!("template '{id}'")))
}
