use crate::calc::EngineError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, StudentRecord, ViewFilters};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn engine_err(id: &str, e: EngineError) -> serde_json::Value {
    err(id, &e.code, e.message, e.details)
}

pub fn parse_filters(req: &Request) -> Result<ViewFilters, serde_json::Value> {
    roster::parse_view_filters(req.params.get("filters")).map_err(|e| engine_err(&req.id, e))
}

/// Snapshot of the records the active filters select.
pub fn filtered_view(state: &AppState, filters: &ViewFilters) -> Vec<StudentRecord> {
    roster::apply_filters(roster::cohort_view(&state.cohorts, filters.semester), filters)
}
