
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar};

fn hk1_row(id: &str, class: &str, tx: f64, ck: f64) -> serde_json::Value {
    json!({
        "ID": id,
        "Họ và tên": format!("Student {id}"),
        "Lớp": class,
        "ĐBQtx": tx,
        "GK1": 6.0,
        "CK1": ck,
        "ĐTBhk1": (tx + ck) / 2.0,
    })
}

fn import_cohort(stdin: &mut std::process::ChildStdin, reader: &mut std::io::BufReader<std::process::ChildStdout>) {
    request_ok(
        stdin,
        reader,
        "import",
        "rows.import",
        json!({
            "grade": "10",
            "semester": "HK1",
            "rows": [
                hk1_row("s1", "10A1", 8.0, 6.0),
                hk1_row("s2", "10A1", 5.0, 7.0),
                hk1_row("s3", "10A2", 9.0, 6.0),
                hk1_row("s4", "10A2", 7.0, 6.0),
            ],
        }),
    );
}

#[test]
fn group_deltas_come_from_group_means_and_sort_descending() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    import_cohort(&mut stdin, &mut reader);

    let delta = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.delta",
        json!({ "filters": { "semester": "HK1" } }),
    );

    let by_class = delta.get("byClass").and_then(|v| v.as_array()).unwrap();
    assert_eq!(by_class.len(), 2);
    // 10A2 has the wider positive gap and leads.
    assert_eq!(by_class[0].get("name").and_then(|v| v.as_str()), Some("10A2"));
    assert_eq!(by_class[0].get("delta").and_then(|v| v.as_f64()), Some(2.0));
    // 10A1 nets out to zero even though its students diverge by ±2.
    assert_eq!(by_class[1].get("name").and_then(|v| v.as_str()), Some("10A1"));
    assert_eq!(by_class[1].get("delta").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(
        by_class[1]
            .pointer("/distribution/counts/Thi thấp hơn quá trình")
            .and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        by_class[1]
            .pointer("/distribution/counts/Thi cao hơn quá trình")
            .and_then(|v| v.as_u64()),
        Some(1)
    );

    let overall = delta.get("overall").unwrap();
    assert_eq!(overall.get("name").and_then(|v| v.as_str()), Some("Toàn trường"));
    assert_eq!(overall.get("n").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(overall.get("meanTX").and_then(|v| v.as_f64()), Some(7.25));
    assert_eq!(overall.get("meanCK").and_then(|v| v.as_f64()), Some(6.25));
    assert_eq!(overall.get("delta").and_then(|v| v.as_f64()), Some(1.0));
    assert_eq!(
        overall
            .pointer("/distribution/percentages/Thi thấp hơn quá trình")
            .and_then(|v| v.as_str()),
        Some("75.0%")
    );
    assert_eq!(
        overall
            .pointer("/distribution/percentages/Phù hợp")
            .and_then(|v| v.as_str()),
        Some("0.0%")
    );

    let students = delta.get("students").and_then(|v| v.as_array()).unwrap();
    assert_eq!(students.len(), 4);
    assert_eq!(students[0].get("id").and_then(|v| v.as_str()), Some("s1"));
    assert_eq!(students[0].get("delta").and_then(|v| v.as_f64()), Some(2.0));
    assert_eq!(
        students[0].get("group").and_then(|v| v.as_str()),
        Some("Thi thấp hơn quá trình")
    );
}

#[test]
fn grade_filter_renames_the_cohort_row() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    import_cohort(&mut stdin, &mut reader);

    let delta = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.delta",
        json!({ "filters": { "semester": "HK1", "grade": "10" } }),
    );
    assert_eq!(
        delta.pointer("/overall/name").and_then(|v| v.as_str()),
        Some("Khối 10")
    );
}

#[test]
fn full_year_delta_is_refused() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    import_cohort(&mut stdin, &mut reader);

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "analytics.delta",
        json!({ "filters": { "semester": "CN" } }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("bad_params"));
}
