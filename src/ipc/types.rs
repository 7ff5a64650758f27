use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One stdin line: `{"id", "method", "params"}`.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// State carried between requests. Handlers borrow `db` for the duration of
/// one call.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn open(&mut self, workspace: PathBuf, conn: Connection) {
        self.workspace = Some(workspace);
        self.db = Some(conn);
    }

    /// Drops the connection so the database file can be replaced.
    pub fn close_db(&mut self) {
        self.db = None;
    }
}
