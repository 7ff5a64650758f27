use crate::error::{HourError, HourResult};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Grid columns 0 and 1 hold the group and subject labels.
pub const LABEL_COLUMNS: usize = 2;

const FIRST_HALF_MONTHS: [u32; 4] = [9, 10, 11, 12];
const SECOND_HALF_MONTHS: [u32; 6] = [1, 2, 3, 4, 5, 6];

/// Every day of `month` except Sundays, ascending.
pub fn teaching_days(year: i32, month: u32) -> HourResult<Vec<NaiveDate>> {
    if !(1..=12).contains(&month) {
        return Err(HourError::invalid(format!(
            "month must be between 1 and 12, got {}",
            month
        )));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| HourError::invalid(format!("year out of range: {}", year)))?;

    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter(|d| d.weekday() != Weekday::Sun)
        .collect())
}

/// Maps a grid column back to its date.
pub fn date_for_column(dates: &[NaiveDate], column: usize) -> Option<NaiveDate> {
    column
        .checked_sub(LABEL_COLUMNS)
        .and_then(|i| dates.get(i))
        .copied()
}

/// Column headers of a month grid: two label columns, then the day of month.
pub fn grid_headers(dates: &[NaiveDate]) -> Vec<String> {
    let mut headers = vec!["group".to_string(), "subject".to_string()];
    headers.extend(dates.iter().map(|d| d.format("%d").to_string()));
    headers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HalfYear {
    /// September..December of the base year, semester 1.
    First,
    /// January..June of the following year, semester 2.
    Second,
}

impl HalfYear {
    pub fn parse(s: &str) -> HourResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "second" => Ok(Self::Second),
            other => Err(HourError::invalid(format!(
                "half must be one of: first, second (got {:?})",
                other
            ))),
        }
    }

    pub fn from_semester(semester: i64) -> HourResult<Self> {
        match semester {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(HourError::invalid(format!(
                "semester must be 1 or 2, got {}",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }

    pub fn semester(self) -> i64 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    pub fn months(self) -> &'static [u32] {
        match self {
            Self::First => &FIRST_HALF_MONTHS,
            Self::Second => &SECOND_HALF_MONTHS,
        }
    }

    pub fn contains_month(self, month: u32) -> bool {
        self.months().contains(&month)
    }

    pub fn calendar_year(self, base_year: i32) -> i32 {
        match self {
            Self::First => base_year,
            Self::Second => base_year + 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// First and last calendar day covered by a half-year.
pub fn half_year_date_range(half: HalfYear, base_year: i32) -> HourResult<(NaiveDate, NaiveDate)> {
    let year = half.calendar_year(base_year);
    let months = half.months();
    let (Some(&first_month), Some(&last_month)) = (months.first(), months.last()) else {
        return Err(HourError::invalid("half-year has no months"));
    };
    let start = NaiveDate::from_ymd_opt(year, first_month, 1)
        .ok_or_else(|| HourError::invalid(format!("year out of range: {}", year)))?;
    let end = last_day_of_month(year, last_month)?;
    Ok((start, end))
}

pub fn sundays_in_half_year(half: HalfYear, base_year: i32) -> HourResult<usize> {
    let (start, end) = half_year_date_range(half, base_year)?;
    Ok(start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| d.weekday() == Weekday::Sun)
        .count())
}

fn last_day_of_month(year: i32, month: u32) -> HourResult<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| HourError::invalid(format!("year out of range: {}", year)))
}
