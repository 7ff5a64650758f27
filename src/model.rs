use chrono::NaiveDate;
use serde::Serialize;

/// Planned hours for one (group, subject, semester).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumEntry {
    pub id: i64,
    pub semester: i64,
    pub total_hour: i64,
    pub group_name: String,
    pub subject_name: String,
}

/// Hours actually taught on one date for one (group, subject, semester).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDayLog {
    pub id: i64,
    pub date: NaiveDate,
    pub subject_name: String,
    pub group_name: String,
    pub semester: i64,
    pub hours: f64,
}

impl WorkDayLog {
    pub fn is_for(&self, group_name: &str, subject_name: &str, semester: i64) -> bool {
        self.group_name == group_name
            && self.subject_name == subject_name
            && self.semester == semester
    }
}

/// Groups and subjects share one shape: a unique name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Group,
    Subject,
}

impl NameKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Group => "groups",
            Self::Subject => "subjects",
        }
    }

    /// Column in `curriculums` and `workDays` that references this kind by name.
    pub fn ref_column(self) -> &'static str {
        match self {
            Self::Group => "group_name",
            Self::Subject => "subject_name",
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Subject => "subject",
        }
    }
}
