use crate::calendar::HalfYear;
use crate::error::{HourError, HourResult};
use crate::model::{CurriculumEntry, NameKind, WorkDayLog};
use crate::store;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectHours {
    pub name: String,
    pub hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPlan {
    pub name: String,
    pub subjects: Vec<SubjectHours>,
}

/// Groups entries by group, keeping first-seen order of groups and of
/// subjects within each group.
pub fn build_hierarchy(entries: &[CurriculumEntry]) -> Vec<GroupPlan> {
    let mut groups: Vec<GroupPlan> = Vec::new();
    for e in entries {
        let pos = match groups.iter().position(|g| g.name == e.group_name) {
            Some(pos) => pos,
            None => {
                groups.push(GroupPlan {
                    name: e.group_name.clone(),
                    subjects: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[pos].subjects.push(SubjectHours {
            name: e.subject_name.clone(),
            hours: e.total_hour,
        });
    }
    groups
}

/// Empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub groups: HashSet<String>,
    pub subjects: HashSet<String>,
}

impl ReportFilters {
    pub fn matches(&self, entry: &CurriculumEntry) -> bool {
        (self.groups.is_empty() || self.groups.contains(&entry.group_name))
            && (self.subjects.is_empty() || self.subjects.contains(&entry.subject_name))
    }

    pub fn apply<'a>(&self, entries: &'a [CurriculumEntry]) -> Vec<&'a CurriculumEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub group_name: String,
    pub subject_name: String,
    pub planned_hours: i64,
    pub logged_hours: f64,
}

impl ReportRow {
    /// Planned minus logged; negative when over-taught.
    pub fn remaining_hours(&self) -> f64 {
        self.planned_hours as f64 - self.logged_hours
    }
}

/// Planned vs. logged hours for every curriculum entry of `semester` that
/// passes `filters`, in input order.
pub fn build_report(
    curricula: &[CurriculumEntry],
    logs: &[WorkDayLog],
    semester: i64,
    filters: &ReportFilters,
) -> Vec<ReportRow> {
    curricula
        .iter()
        .filter(|c| c.semester == semester && filters.matches(c))
        .map(|c| ReportRow {
            group_name: c.group_name.clone(),
            subject_name: c.subject_name.clone(),
            planned_hours: c.total_hour,
            logged_hours: logs
                .iter()
                .filter(|l| l.is_for(&c.group_name, &c.subject_name, semester))
                .map(|l| l.hours)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub group_name: String,
    pub subject_name: String,
    pub cells: Vec<Option<f64>>,
}

/// One row per entry, one cell per date.
pub fn build_month_grid(
    entries: &[&CurriculumEntry],
    logs: &[WorkDayLog],
    dates: &[NaiveDate],
    semester: i64,
) -> Vec<GridRow> {
    entries
        .iter()
        .map(|c| GridRow {
            group_name: c.group_name.clone(),
            subject_name: c.subject_name.clone(),
            cells: dates
                .iter()
                .map(|d| {
                    logs.iter()
                        .find(|l| l.date == *d && l.is_for(&c.group_name, &c.subject_name, semester))
                        .map(|l| l.hours)
                })
                .collect(),
        })
        .collect()
}

/// Cell text as the grid shows it.
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.1}", hours)
    } else {
        hours.to_string()
    }
}

pub fn row_matches_search(row: &GridRow, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    row.group_name.to_lowercase().contains(&needle)
        || row.subject_name.to_lowercase().contains(&needle)
        || row
            .cells
            .iter()
            .flatten()
            .any(|h| format_hours(*h).contains(&needle))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub groups: Vec<String>,
    pub subjects: Vec<String>,
}

/// Sorted distinct names appearing in any curriculum.
pub fn filter_options(entries: &[CurriculumEntry]) -> FilterOptions {
    let groups: BTreeSet<&str> = entries.iter().map(|e| e.group_name.as_str()).collect();
    let subjects: BTreeSet<&str> = entries.iter().map(|e| e.subject_name.as_str()).collect();
    FilterOptions {
        groups: groups.into_iter().map(str::to_string).collect(),
        subjects: subjects.into_iter().map(str::to_string).collect(),
    }
}

/// Subjects not yet planned, in stored order.
pub fn available_subjects(all_subjects: &[String], planned: &[CurriculumEntry]) -> Vec<String> {
    let taken: HashSet<&str> = planned.iter().map(|e| e.subject_name.as_str()).collect();
    all_subjects
        .iter()
        .filter(|s| !taken.contains(s.as_str()))
        .cloned()
        .collect()
}

// ---- plan editing ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub subject_name: String,
    pub hours: String,
    pub reason: String,
}

/// Parses edited (subject, hours) rows. Rows with a blank cell are dropped
/// silently; unparsable, negative or repeated rows come back in the skipped list.
pub fn parse_plan_rows(raw: &[(String, String)]) -> (Vec<(String, i64)>, Vec<SkippedRow>) {
    let mut accepted: Vec<(String, i64)> = Vec::new();
    let mut skipped = Vec::new();
    for (subject, hours) in raw {
        let subject = subject.trim();
        let hours = hours.trim();
        if subject.is_empty() || hours.is_empty() {
            continue;
        }
        let skip = |reason: &str| SkippedRow {
            subject_name: subject.to_string(),
            hours: hours.to_string(),
            reason: reason.to_string(),
        };
        match hours.parse::<i64>() {
            Ok(h) if h < 0 => skipped.push(skip("hours cannot be negative")),
            Ok(_) if accepted.iter().any(|(s, _)| s == subject) => {
                skipped.push(skip("subject already listed"))
            }
            Ok(h) => accepted.push((subject.to_string(), h)),
            Err(_) => skipped.push(skip("hours must be a whole number")),
        }
    }
    (accepted, skipped)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub deleted: usize,
    pub created: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Replaces the plan of (group, half) with the edited rows, atomically.
pub fn replace_plan(
    conn: &Connection,
    group_name: &str,
    half: HalfYear,
    raw_rows: &[(String, String)],
) -> HourResult<ReplaceOutcome> {
    let group_name = group_name.trim();
    if group_name.is_empty() {
        return Err(HourError::validation("group must be selected"));
    }
    if !store::name_exists(conn, NameKind::Group, group_name)? {
        return Err(HourError::validation(format!(
            "unknown group '{}'",
            group_name
        )));
    }

    let (parsed, mut skipped) = parse_plan_rows(raw_rows);
    let mut rows = Vec::with_capacity(parsed.len());
    for (subject, hours) in parsed {
        if store::name_exists(conn, NameKind::Subject, &subject)? {
            rows.push((subject, hours));
        } else {
            skipped.push(SkippedRow {
                subject_name: subject,
                hours: hours.to_string(),
                reason: "unknown subject".to_string(),
            });
        }
    }

    let (deleted, created) =
        store::replace_curriculum_rows(conn, group_name, half.semester(), &rows)?;
    info!(
        group = group_name,
        semester = half.semester(),
        deleted,
        created,
        skipped = skipped.len(),
        "plan replaced"
    );
    Ok(ReplaceOutcome {
        deleted,
        created,
        skipped,
    })
}

/// Adds one entry after checking the referenced names and the
/// one-entry-per-(group, subject, semester) rule.
pub fn create_entry(
    conn: &Connection,
    half: HalfYear,
    total_hour: i64,
    group_name: &str,
    subject_name: &str,
) -> HourResult<CurriculumEntry> {
    let group_name = group_name.trim();
    let subject_name = subject_name.trim();
    if total_hour < 0 {
        return Err(HourError::validation("hours cannot be negative"));
    }
    if !store::name_exists(conn, NameKind::Group, group_name)? {
        return Err(HourError::validation(format!("unknown group '{}'", group_name)));
    }
    if !store::name_exists(conn, NameKind::Subject, subject_name)? {
        return Err(HourError::validation(format!(
            "unknown subject '{}'",
            subject_name
        )));
    }
    let existing = store::list_curriculums_for_group(conn, group_name, half.semester())?;
    if existing.iter().any(|e| e.subject_name == subject_name) {
        return Err(HourError::validation(format!(
            "'{}' already has a plan for '{}' in semester {}",
            group_name,
            subject_name,
            half.semester()
        )));
    }
    let entry = store::insert_curriculum(conn, half.semester(), total_hour, group_name, subject_name)?;
    info!(id = entry.id, group = group_name, subject = subject_name, "plan entry created");
    Ok(entry)
}
