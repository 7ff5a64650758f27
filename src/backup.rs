use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DB_FILE_NAME: &str = "hour_track.sqlite3";
const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/hour_track.sqlite3";
const META_WORKSPACE_ENTRY: &str = "meta/workspace.json";
pub const BUNDLE_FORMAT_V1: &str = "hourtrack-workspace-v1";
pub const RAW_SQLITE_FORMAT: &str = "raw-sqlite3";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    version: u32,
    app_version: String,
    exported_at: u64,
}

/// What an import source turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Bundle,
    RawSqlite,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bundle => BUNDLE_FORMAT_V1,
            Self::RawSqlite => RAW_SQLITE_FORMAT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: &'static str,
    pub entry_count: usize,
    pub db_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub source: SourceKind,
    pub db_bytes: u64,
}

/// Writes `manifest.json`, the database and workspace metadata into a zip.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(DB_FILE_NAME);
    if !db_path.is_file() {
        bail!("workspace database not found: {}", db_path.display());
    }
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    };
    write_json_entry(&mut zip, opts, MANIFEST_ENTRY, &manifest)?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    let mut db_file = File::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let db_bytes = std::io::copy(&mut db_file, &mut zip).context("failed to write database entry")?;

    write_json_entry(
        &mut zip,
        opts,
        META_WORKSPACE_ENTRY,
        &serde_json::json!({ "sourceWorkspace": workspace_path.to_string_lossy() }),
    )?;
    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1,
        entry_count: 3,
        db_bytes,
    })
}

fn write_json_entry<T: Serialize>(
    zip: &mut ZipWriter<File>,
    opts: FileOptions,
    name: &str,
    value: &T,
) -> anyhow::Result<()> {
    let text = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", name))?;
    zip.start_file(name, opts)
        .with_context(|| format!("failed to start {}", name))?;
    zip.write_all(&text)
        .with_context(|| format!("failed to write {}", name))
}

/// Restores a bundle or a plain sqlite file as the workspace database. The
/// old database is only replaced once the new one is fully on disk.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let source = sniff_source(in_path)?;
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;

    let dst = workspace_path.join(DB_FILE_NAME);
    let staging = workspace_path.join(format!("{}.importing", DB_FILE_NAME));
    if staging.exists() {
        std::fs::remove_file(&staging)
            .with_context(|| format!("failed to clear {}", staging.display()))?;
    }

    let staged = match source {
        SourceKind::Bundle => extract_bundle_db(in_path, &staging),
        SourceKind::RawSqlite => std::fs::copy(in_path, &staging)
            .with_context(|| format!("failed to copy {}", in_path.display())),
    };
    let db_bytes = match staged {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
    };

    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("failed to remove existing database {}", dst.display()))?;
    }
    std::fs::rename(&staging, &dst)
        .with_context(|| format!("failed to move restored database to {}", dst.display()))?;

    Ok(ImportSummary { source, db_bytes })
}

pub fn sniff_source(path: &Path) -> anyhow::Result<SourceKind> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let mut head = Vec::with_capacity(SQLITE_MAGIC.len());
    (&mut f)
        .take(SQLITE_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .context("failed to read file signature")?;
    if head.starts_with(ZIP_MAGIC) {
        Ok(SourceKind::Bundle)
    } else if head.starts_with(SQLITE_MAGIC) {
        Ok(SourceKind::RawSqlite)
    } else {
        bail!("{} is neither a workspace bundle nor a sqlite database", path.display())
    }
}

fn extract_bundle_db(in_path: &Path, staging: &Path) -> anyhow::Result<u64> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest: Manifest = {
        let entry = archive
            .by_name(MANIFEST_ENTRY)
            .context("bundle missing manifest.json")?;
        serde_json::from_reader(entry).context("manifest.json is invalid")?
    };
    if manifest.format != BUNDLE_FORMAT_V1 {
        bail!("unsupported bundle format: {}", manifest.format);
    }

    let mut db_entry = archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle missing {}", DB_ENTRY))?;
    let mut out = File::create(staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    let n = std::io::copy(&mut db_entry, &mut out).context("failed to extract database entry")?;
    out.flush().context("failed to flush extracted database")?;
    Ok(n)
}
