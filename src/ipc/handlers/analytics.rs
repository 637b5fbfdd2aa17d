use serde_json::json;
use tracing::debug;

use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{filtered_view, parse_filters};
use crate::ipc::types::{AppState, Request};
use crate::roster::Semester;

fn handle_general(state: &AppState, req: &Request) -> serde_json::Value {
    let filters = match parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let records = filtered_view(state, &filters);
    let by_class = calc::stats_by_class(&records, filters.column, filters.semester);
    let overall = calc::overall_stats(&records, filters.column, filters.semester);
    debug!(
        records = records.len(),
        classes = by_class.len(),
        "computed general statistics"
    );
    ok(
        &req.id,
        json!({
            "filters": &filters,
            "byClass": by_class,
            "overall": overall,
        }),
    )
}

fn handle_delta(state: &AppState, req: &Request) -> serde_json::Value {
    let filters = match parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    // Delta compares one term's coursework with that same term's exam; a
    // merged year view has no single exam to compare against.
    if filters.semester == Semester::FullYear {
        return err(
            &req.id,
            "bad_params",
            "delta analysis is defined per semester; select HK1 or HK2",
            None,
        );
    }
    let records = filtered_view(state, &filters);
    let overall_name = match filters.grade.as_deref() {
        Some(g) => format!("Khối {}", g),
        None => "Toàn trường".to_string(),
    };
    ok(
        &req.id,
        json!({
            "filters": &filters,
            "byClass": calc::delta_by_class(&records),
            "overall": calc::delta_stats(&records, &overall_name),
            "students": calc::student_deltas(&records),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.general" => Some(handle_general(state, req)),
        "analytics.delta" => Some(handle_delta(state, req)),
        _ => None,
    }
}
