
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar};

fn hk1_row(id: &str, class: &str, dtb: f64) -> serde_json::Value {
    json!({
        "ID": id,
        "Họ và tên": format!("Student {id}"),
        "Lớp": class,
        "ĐBQtx": 7.0,
        "GK1": 6.5,
        "CK1": 7.5,
        "ĐTBhk1": dtb,
    })
}

#[test]
fn full_year_is_not_an_import_target() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "rows.import",
        json!({ "grade": "10", "semester": "CN", "rows": [hk1_row("s1", "10A1", 7.0)] }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("bad_params"));
}

#[test]
fn import_requires_rows_array() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "rows.import",
        json!({ "grade": "10", "semester": "HK1" }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("bad_params"));
}

#[test]
fn non_object_rows_are_skipped_not_fatal() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rows.import",
        json!({
            "grade": "10",
            "semester": "HK1",
            "rows": [hk1_row("s1", "10A1", 7.0), 42, hk1_row("s2", "10A1", 6.0), "junk"],
        }),
    );
    assert_eq!(result.get("imported").and_then(|v| v.as_u64()), Some(2));
}

#[test]
fn reimport_replaces_the_slot() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rows.import",
        json!({
            "grade": "10",
            "semester": "HK1",
            "rows": [hk1_row("s1", "10A1", 7.0), hk1_row("s2", "10A1", 6.0)],
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rows.import",
        json!({ "grade": "10", "semester": "HK1", "rows": [hk1_row("s3", "10A2", 5.0)] }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "filters": { "semester": "HK1" } }),
    );
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(
        listed.pointer("/students/0/id").and_then(|v| v.as_str()),
        Some("s3")
    );
}

#[test]
fn clear_removes_one_grade_or_everything() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rows.import",
        json!({ "grade": "10", "semester": "HK1", "rows": [hk1_row("s1", "10A1", 7.0)] }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rows.import",
        json!({ "grade": "11", "semester": "HK1", "rows": [hk1_row("s2", "11B1", 6.0)] }),
    );

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(
        health.get("grades").and_then(|v| v.as_array()).map(Vec::len),
        Some(2)
    );
    assert_eq!(
        health.pointer("/grades/0/firstTermCount").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert!(health.pointer("/grades/0/importedAt").and_then(|v| v.as_str()).is_some());

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "dataset.clear",
        json!({ "grade": "10" }),
    );
    assert_eq!(cleared.get("cleared").and_then(|v| v.as_u64()), Some(1));

    let cleared_all = request_ok(&mut stdin, &mut reader, "5", "dataset.clear", json!({}));
    assert_eq!(cleared_all.get("cleared").and_then(|v| v.as_u64()), Some(1));

    let health = request_ok(&mut stdin, &mut reader, "6", "health", json!({}));
    assert_eq!(
        health.get("grades").and_then(|v| v.as_array()).map(Vec::len),
        Some(0)
    );
}
