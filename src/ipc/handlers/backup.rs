use crate::backup;
use crate::db;
use crate::ipc::response::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn workspace_param(state: &AppState, req: &Request) -> Option<PathBuf> {
    req.params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
}

fn handle_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(FULL)") {
            warn!(error = %e, "checkpoint before export failed");
        }
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        }
    };
    info!(path = %out_path, entries = export.entry_count, "workspace bundle exported");

    ok(
        &req.id,
        json!({
            "ok": true,
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbBytes": export.db_bytes
        }),
    )
}

fn handle_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    if let Err(e) = backup::sniff_source(&src) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": in_path })),
        );
    }

    // Release the file before it is replaced.
    let previous = state.workspace.clone();
    state.close_db();

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %in_path, error = %e, "restore failed, reopening previous workspace");
            if let Some(prev) = previous {
                match db::open_db(&prev) {
                    Ok(conn) => state.open(prev, conn),
                    Err(reopen) => {
                        state.workspace = None;
                        return err(
                            &req.id,
                            "db_open_failed",
                            reopen.to_string(),
                            Some(json!({
                                "path": prev.to_string_lossy(),
                                "restoreError": e.to_string()
                            })),
                        );
                    }
                }
            }
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": in_path })),
            );
        }
    };

    match db::open_db(&workspace_path) {
        Ok(conn) => {
            info!(
                workspace = %workspace_path.display(),
                format = import.source.as_str(),
                bytes = import.db_bytes,
                "workspace restored"
            );
            let shown = workspace_path.to_string_lossy().to_string();
            state.open(workspace_path, conn);
            ok(
                &req.id,
                json!({
                    "ok": true,
                    "workspacePath": shown,
                    "bundleFormatDetected": import.source.as_str()
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_workspace_bundle(state, req)),
        _ => None,
    }
}
