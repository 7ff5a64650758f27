use crate::db;
use crate::ipc::response::{err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Datelike;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

#[derive(Clone, Copy)]
enum SetupSection {
    Appearance,
    Calendar,
    Reports,
}

impl SetupSection {
    const ALL: [SetupSection; 3] = [Self::Appearance, Self::Calendar, Self::Reports];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "appearance" => Some(Self::Appearance),
            "calendar" => Some(Self::Calendar),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Appearance => "appearance",
            Self::Calendar => "calendar",
            Self::Reports => "reports",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Appearance => "setup.appearance",
            Self::Calendar => "setup.calendar",
            Self::Reports => "setup.reports",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Appearance => json!({ "theme": "blue" }),
        SetupSection::Calendar => json!({ "baseYear": null }),
        SetupSection::Reports => json!({ "defaultHalf": "first" }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_one_of(v: &Value, key: &str, allowed: &[&str]) -> Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be string", key))?
        .trim()
        .to_ascii_lowercase();
    if !allowed.contains(&s.as_str()) {
        return Err(format!("{} must be one of: {}", key, allowed.join(", ")));
    }
    Ok(s)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Appearance => match k.as_str() {
                "theme" => {
                    let theme = parse_one_of(v, k, &["light", "dark", "blue"])?;
                    obj.insert(k.clone(), Value::String(theme));
                }
                _ => return Err(format!("unknown appearance field: {}", k)),
            },
            SetupSection::Calendar => match k.as_str() {
                "baseYear" => {
                    let year = if v.is_null() {
                        Value::Null
                    } else {
                        Value::from(parse_i64_range(v, k, 1900, 9999)?)
                    };
                    obj.insert(k.clone(), year);
                }
                _ => return Err(format!("unknown calendar field: {}", k)),
            },
            SetupSection::Reports => match k.as_str() {
                "defaultHalf" => {
                    let half = parse_one_of(v, k, &["first", "second"])?;
                    obj.insert(k.clone(), Value::String(half));
                }
                _ => return Err(format!("unknown reports field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults.
            if let Err(msg) = merge_section_patch(section, &mut current, saved_obj) {
                warn!(section = section.name(), error = %msg, "ignoring saved settings");
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

/// Explicit `baseYear` param, then the saved calendar setting, then the
/// current local year.
pub(crate) fn resolve_base_year(
    conn: Option<&rusqlite::Connection>,
    params: &Value,
) -> Result<i32, String> {
    if let Some(v) = params.get("baseYear").filter(|v| !v.is_null()) {
        return parse_i64_range(v, "baseYear", 1900, 9999).map(|y| y as i32);
    }
    if let Some(conn) = conn {
        let calendar = load_section(conn, SetupSection::Calendar).map_err(|e| e.to_string())?;
        if let Some(y) = calendar.get("baseYear").and_then(|v| v.as_i64()) {
            return Ok(y as i32);
        }
    }
    Ok(chrono::Local::now().year())
}

/// Saved `reports.defaultHalf`, as used when a report request names no half.
pub(crate) fn default_report_half(conn: &rusqlite::Connection) -> anyhow::Result<String> {
    let reports = load_section(conn, SetupSection::Reports)?;
    Ok(reports
        .get("defaultHalf")
        .and_then(|v| v.as_str())
        .unwrap_or("first")
        .to_string())
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    info!(section = section.name(), "settings updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
