use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{filtered_view, parse_filters};
use crate::ipc::types::{AppState, Request};
use crate::roster;

fn handle_students_list(state: &AppState, req: &Request) -> serde_json::Value {
    let filters = match parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let students = filtered_view(state, &filters);
    ok(
        &req.id,
        json!({
            "count": students.len(),
            "students": students,
        }),
    )
}

fn handle_classes_list(state: &AppState, req: &Request) -> serde_json::Value {
    let filters = match parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    // The picker keeps offering every class in scope, so an already-active
    // class selection is not applied here.
    let mut scoped = filters;
    scoped.class_name = None;
    let records = filtered_view(state, &scoped);
    ok(&req.id, json!({ "classes": roster::class_names(&records) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "classes.list" => Some(handle_classes_list(state, req)),
        _ => None,
    }
}
