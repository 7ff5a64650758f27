#[path = "../src/backup.rs"]
mod backup;

mod test_support;

use serde_json::json;
use std::fs::File;
use std::io::Read;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("hourtrack-backup-src");
    let workspace2 = temp_dir("hourtrack-backup-dst");
    let out_dir = temp_dir("hourtrack-backup-out");

    let db_src = workspace.join("hour_track.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.hourtrack.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);
    assert_eq!(export.db_bytes, bytes.len() as u64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    archive
        .by_name("db/hour_track.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.source, backup::SourceKind::Bundle);
    assert_eq!(import.db_bytes, bytes.len() as u64);

    let db_dst = workspace2.join("hour_track.sqlite3");
    let restored = std::fs::read(&db_dst).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn raw_sqlite_file_is_accepted_on_import() {
    let src_dir = temp_dir("hourtrack-backup-raw-src");
    let dst_dir = temp_dir("hourtrack-backup-raw-dst");
    let raw = src_dir.join("old-year.sqlite3");
    std::fs::write(&raw, b"SQLite format 3\0payload").expect("write raw db");

    let import = backup::import_workspace_bundle(&raw, &dst_dir).expect("import raw");
    assert_eq!(import.source.as_str(), backup::RAW_SQLITE_FORMAT);
    assert!(dst_dir.join("hour_track.sqlite3").is_file());
    assert!(!dst_dir.join("hour_track.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(src_dir);
    let _ = std::fs::remove_dir_all(dst_dir);
}

#[test]
fn unknown_files_are_rejected_and_keep_the_database() {
    let src_dir = temp_dir("hourtrack-backup-junk-src");
    let dst_dir = temp_dir("hourtrack-backup-junk-dst");
    let junk = src_dir.join("notes.txt");
    std::fs::write(&junk, b"just some text").expect("write junk");
    let existing = dst_dir.join("hour_track.sqlite3");
    std::fs::write(&existing, b"current").expect("write current db");

    let err = backup::import_workspace_bundle(&junk, &dst_dir).expect_err("junk rejected");
    assert!(err.to_string().contains("neither a workspace bundle"));
    assert_eq!(std::fs::read(&existing).expect("read current db"), b"current");

    let _ = std::fs::remove_dir_all(src_dir);
    let _ = std::fs::remove_dir_all(dst_dir);
}

#[test]
fn missing_workspace_database_fails_export() {
    let empty = temp_dir("hourtrack-backup-empty");
    let err = backup::export_workspace_bundle(&empty, &empty.join("out.zip"))
        .expect_err("nothing to export");
    assert!(err.to_string().contains("workspace database not found"));
    let _ = std::fs::remove_dir_all(empty);
}

#[test]
fn ipc_restore_reopens_the_workspace() {
    let workspace = temp_dir("hourtrack-backup-ipc");
    let bundle = workspace.join("backup.zip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(&mut stdin, &mut reader, "2", "groups.create", json!({ "name": "Kept" }));
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    request_ok(&mut stdin, &mut reader, "4", "groups.create", json!({ "name": "Dropped" }));

    let restored = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(restored["bundleFormatDetected"], json!(backup::BUNDLE_FORMAT_V1));

    let groups = request_ok(&mut stdin, &mut reader, "6", "groups.list", json!({}));
    assert_eq!(groups["names"], json!(["Kept"]));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_restore_into_another_path_keeps_the_open_workspace() {
    let current = temp_dir("hourtrack-backup-keep-a");
    let other = temp_dir("hourtrack-backup-keep-b");
    let inputs = temp_dir("hourtrack-backup-keep-in");
    let junk = inputs.join("junk.bin");
    std::fs::write(&junk, b"not a backup").expect("write junk");
    // Zip signature, but no readable archive behind it.
    let broken_zip = inputs.join("broken.zip");
    std::fs::write(&broken_zip, b"PK\x03\x04truncated").expect("write broken zip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": current.to_string_lossy() }),
    );
    request_ok(&mut stdin, &mut reader, "2", "groups.create", json!({ "name": "G1" }));

    for (i, input) in [&junk, &broken_zip].into_iter().enumerate() {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &format!("import-{}", i),
            "backup.importWorkspaceBundle",
            json!({
                "inPath": input.to_string_lossy(),
                "workspacePath": other.to_string_lossy(),
            }),
        );
        assert_eq!(code, "io_failed");

        let health = request_ok(&mut stdin, &mut reader, &format!("health-{}", i), "health", json!({}));
        assert_eq!(health["workspacePath"], json!(current.to_string_lossy()));
        let groups = request_ok(&mut stdin, &mut reader, &format!("list-{}", i), "groups.list", json!({}));
        assert_eq!(groups["names"], json!(["G1"]));
    }
    assert!(!other.join("hour_track.sqlite3").exists());

    let _ = std::fs::remove_dir_all(current);
    let _ = std::fs::remove_dir_all(other);
    let _ = std::fs::remove_dir_all(inputs);
}

#[test]
fn signature_decides_the_source_kind() {
    let dir = temp_dir("hourtrack-backup-sniff");
    let raw = dir.join("raw.sqlite3");
    std::fs::write(&raw, b"SQLite format 3\0rest").expect("write raw");
    let short = dir.join("short.bin");
    std::fs::write(&short, b"PK").expect("write short");

    assert_eq!(backup::sniff_source(&raw).expect("sniff raw"), backup::SourceKind::RawSqlite);
    assert!(backup::sniff_source(&short).is_err());

    let _ = std::fs::remove_dir_all(dir);
}
