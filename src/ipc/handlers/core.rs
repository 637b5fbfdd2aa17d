use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, Semester};

fn handle_health(state: &AppState, req: &Request) -> serde_json::Value {
    let grades: Vec<serde_json::Value> = state
        .cohorts
        .iter()
        .map(|(grade, data)| {
            json!({
                "grade": grade,
                "firstTermCount": data.first_term.len(),
                "secondTermCount": data.second_term.len(),
                "importedAt": data.imported_at,
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "grades": grades,
        }),
    )
}

fn handle_rows_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match required_str(req, "grade") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    if grade.is_empty() {
        return err(&req.id, "bad_params", "grade must not be empty", None);
    }
    let semester_raw = match required_str(req, "semester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester = match Semester::parse(&semester_raw) {
        Some(Semester::FullYear) | None => {
            return err(
                &req.id,
                "bad_params",
                "semester must be HK1 or HK2; the full-year view is derived, not imported",
                None,
            )
        }
        Some(s) => s,
    };
    let Some(rows) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing rows", None);
    };

    let mut maps: Vec<serde_json::Map<String, serde_json::Value>> =
        Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match row.as_object() {
            Some(obj) => maps.push(obj.clone()),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            grade = %grade,
            semester = semester.as_str(),
            skipped,
            "ignoring non-object entries in rows"
        );
    }

    let records: Vec<_> = maps.iter().map(|m| roster::normalize_row(m, semester)).collect();
    let imported = records.len();

    let slot = state.cohorts.entry(grade.clone()).or_default();
    match semester {
        Semester::First => slot.first_term = records,
        _ => {
            slot.second_term = records;
            // The merge later reads TBcn straight from these rows.
            slot.raw_second_term = maps;
        }
    }
    slot.imported_at = Some(Utc::now());

    info!(grade = %grade, semester = semester.as_str(), imported, "imported grade rows");
    ok(
        &req.id,
        json!({
            "grade": grade,
            "semester": semester.as_str(),
            "imported": imported,
        }),
    )
}

fn handle_dataset_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    match req.params.get("grade").and_then(|v| v.as_str()) {
        Some(grade) => {
            let cleared = usize::from(state.cohorts.remove(grade).is_some());
            info!(grade, cleared, "cleared grade dataset");
            ok(&req.id, json!({ "cleared": cleared }))
        }
        None => {
            let cleared = state.cohorts.len();
            state.cohorts.clear();
            info!(cleared, "cleared all datasets");
            ok(&req.id, json!({ "cleared": cleared }))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "rows.import" => Some(handle_rows_import(state, req)),
        "dataset.clear" => Some(handle_dataset_clear(state, req)),
        _ => None,
    }
}
