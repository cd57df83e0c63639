use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::server::AppState;
use crate::observability::LogEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

/// `GET /admin/status`
pub async fn get_status(State(state): State<AppState>) -> Json<Value> {
    let security = &state.config.security;
    Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "rateLimiter": {
            "trackedClients": state.limiter.len(),
            "windowMs": security.window_ms,
            "maxRequests": security.max_requests,
        },
        "requestLog": {
            "entries": state.logger.len(),
            "droppedFileRecords": state.logger.dropped_records(),
            "file": state.logger.file_path().map(|p| p.display().to_string()),
        },
    }))
}

/// `GET /admin/logs?userId=&requestId=`
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<LogEntry>> {
    let entries = match (query.request_id, query.user_id) {
        (Some(request_id), _) => state.logger.logs_by_request_id(&request_id),
        (None, Some(user_id)) => state.logger.logs_by_user_id(&user_id),
        (None, None) => state.logger.logs(),
    };
    Json(entries)
}
