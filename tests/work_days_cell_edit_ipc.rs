mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

fn cell(column: i64, text: &str) -> serde_json::Value {
    json!({
        "year": 2025,
        "month": 1,
        "column": column,
        "groupName": "G1",
        "subjectName": "S1",
        "half": "second",
        "text": text
    })
}

#[test]
fn cell_edits_upsert_one_row_per_cell() {
    let workspace = temp_dir("hourtrack-cell-edit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(&mut stdin, &mut reader, "2", "groups.create", json!({ "name": "G1" }));
    request_ok(&mut stdin, &mut reader, "3", "subjects.create", json!({ "name": "S1" }));

    // Jan 2025: Wed 1st is the first teaching day, so column 2.
    let inserted = request_ok(&mut stdin, &mut reader, "4", "workDays.applyCellEdit", cell(2, "2"));
    assert_eq!(inserted["action"], json!("inserted"));
    let id = inserted["id"].clone();

    let updated = request_ok(&mut stdin, &mut reader, "5", "workDays.applyCellEdit", cell(2, " 2.5 "));
    assert_eq!(updated["action"], json!("updated"));
    assert_eq!(updated["id"], id);

    let logs = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "workDays.list",
        json!({ "semester": 2, "date": "2025-01-01" }),
    );
    let rows = logs["workDays"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["hours"].as_f64(), Some(2.5));
    assert_eq!(rows[0]["date"], json!("2025-01-01"));

    for (i, bad) in ["abc", "-1"].into_iter().enumerate() {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &format!("bad-{}", i),
            "workDays.applyCellEdit",
            cell(2, bad),
        );
        assert_eq!(code, "validation_failed");
    }
    let code = request_err(&mut stdin, &mut reader, "7", "workDays.applyCellEdit", cell(1, "3"));
    assert_eq!(code, "bad_params");

    let cleared = request_ok(&mut stdin, &mut reader, "8", "workDays.applyCellEdit", cell(2, ""));
    assert_eq!(cleared["action"], json!("deleted"));
    let noop = request_ok(&mut stdin, &mut reader, "9", "workDays.applyCellEdit", cell(2, ""));
    assert_eq!(noop["action"], json!("unchanged"));

    let logs = request_ok(&mut stdin, &mut reader, "10", "workDays.list", json!({}));
    assert_eq!(logs["workDays"], json!([]));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn grid_position_without_year_uses_base_year_setting() {
    let workspace = temp_dir("hourtrack-cell-base-year");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(&mut stdin, &mut reader, "2", "groups.create", json!({ "name": "G1" }));
    request_ok(&mut stdin, &mut reader, "3", "subjects.create", json!({ "name": "S1" }));
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "setup.update",
        json!({ "section": "calendar", "patch": { "baseYear": 2024 } }),
    );

    let out = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "workDays.applyCellEdit",
        json!({
            "month": 9,
            "column": 2,
            "groupName": "G1",
            "subjectName": "S1",
            "semester": 1,
            "text": "1"
        }),
    );
    assert_eq!(out["action"], json!("inserted"));

    let logs = request_ok(&mut stdin, &mut reader, "6", "workDays.list", json!({ "semester": 1 }));
    assert_eq!(logs["workDays"][0]["date"], json!("2024-09-02"));

    let _ = std::fs::remove_dir_all(workspace);
}
