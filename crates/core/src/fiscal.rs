use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::errors::ForceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Q1 => 0,
            Self::Q2 => 1,
            Self::Q3 => 2,
            Self::Q4 => 3,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            other => Err(ForceError::validation(format!(
                "unknown fiscal quarter `{other}` (expected Q1, Q2, Q3 or Q4)"
            ))),
        }
    }
}

/// Inclusive date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// `CloseDate >= 2026-02-01 AND CloseDate <= 2026-04-30`
    pub fn soql_filter(&self, field: &str) -> String {
        format!("{field} >= {} AND {field} <= {}", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A named fiscal year split into four contiguous quarters.
///
/// Built by configuration loading and checked with [`FiscalCalendar::validate`]
/// before it is handed to anything else, so lookups never see a partial table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FiscalCalendar {
    pub label: String,
    pub year: DateRange,
    pub quarters: [DateRange; 4],
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            label: "FY27".to_string(),
            year: range((2026, 2, 1), (2027, 1, 31)),
            quarters: [
                range((2026, 2, 1), (2026, 4, 30)),
                range((2026, 5, 1), (2026, 7, 31)),
                range((2026, 8, 1), (2026, 10, 31)),
                range((2026, 11, 1), (2027, 1, 31)),
            ],
        }
    }
}

fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
    let date = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    DateRange::new(date(start), date(end))
}

impl FiscalCalendar {
    pub fn new(
        label: impl Into<String>,
        year: DateRange,
        quarters: [DateRange; 4],
    ) -> Result<Self, ForceError> {
        let calendar = Self { label: label.into(), year, quarters };
        calendar.validate()?;
        Ok(calendar)
    }

    /// Quarters must start on the fiscal year start, follow each other
    /// without gaps or overlaps, and end on the fiscal year end.
    pub fn validate(&self) -> Result<(), ForceError> {
        if self.label.trim().is_empty() {
            return Err(ForceError::validation("fiscal.label must not be empty"));
        }
        if self.year.start > self.year.end {
            return Err(ForceError::validation(format!(
                "fiscal year {} ends before it starts",
                self.year
            )));
        }

        for (quarter, range) in Quarter::ALL.iter().zip(&self.quarters) {
            if range.start > range.end {
                return Err(ForceError::validation(format!(
                    "fiscal.{} {range} ends before it starts",
                    quarter.as_str().to_ascii_lowercase()
                )));
            }
        }

        if self.quarters[0].start != self.year.start {
            return Err(ForceError::validation(format!(
                "fiscal.q1 must start on the fiscal year start {}",
                self.year.start
            )));
        }
        for pair in Quarter::ALL.windows(2) {
            let (previous, next) = (pair[0], pair[1]);
            let expected = self.quarters[previous.index()].end.checked_add_days(Days::new(1));
            if expected != Some(self.quarters[next.index()].start) {
                return Err(ForceError::validation(format!(
                    "fiscal.{} must start the day after fiscal.{} ends (gap or overlap between {} and {})",
                    next.as_str().to_ascii_lowercase(),
                    previous.as_str().to_ascii_lowercase(),
                    self.quarters[previous.index()],
                    self.quarters[next.index()],
                )));
            }
        }
        if self.quarters[3].end != self.year.end {
            return Err(ForceError::validation(format!(
                "fiscal.q4 must end on the fiscal year end {}",
                self.year.end
            )));
        }

        Ok(())
    }

    pub fn quarter(&self, quarter: Quarter) -> DateRange {
        self.quarters[quarter.index()]
    }

    /// Case-insensitive `Q1..Q4` lookup; anything else is a validation error.
    pub fn resolve(&self, name: &str) -> Result<(Quarter, DateRange), ForceError> {
        let quarter: Quarter = name.parse()?;
        Ok((quarter, self.quarter(quarter)))
    }

    pub fn quarter_of(&self, date: NaiveDate) -> Option<Quarter> {
        Quarter::ALL.into_iter().find(|quarter| self.quarter(*quarter).contains(date))
    }

    /// `Q2 FY27`
    pub fn quarter_label(&self, quarter: Quarter) -> String {
        format!("{quarter} {}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::{DateRange, FiscalCalendar, Quarter};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn default_calendar_is_fy27() {
        let calendar = FiscalCalendar::default();
        calendar.validate().expect("default calendar is valid");

        assert_eq!(calendar.label, "FY27");
        assert_eq!(calendar.quarter(Quarter::Q1), DateRange::new(date(2026, 2, 1), date(2026, 4, 30)));
        assert_eq!(calendar.quarter(Quarter::Q4), DateRange::new(date(2026, 11, 1), date(2027, 1, 31)));
        assert_eq!(calendar.quarter_label(Quarter::Q3), "Q3 FY27");
    }

    #[test]
    fn quarters_cover_year_without_gaps_or_overlaps() {
        let calendar = FiscalCalendar::default();
        let ranges: Vec<DateRange> = Quarter::ALL.iter().map(|q| calendar.quarter(*q)).collect();

        for pair in ranges.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
            assert_eq!(pair[0].end.checked_add_days(Days::new(1)), Some(pair[1].start));
        }
        assert_eq!(ranges[0].start, calendar.year.start);
        assert_eq!(ranges[3].end, calendar.year.end);

        let mut day = calendar.year.start;
        while day <= calendar.year.end {
            assert!(calendar.quarter_of(day).is_some(), "{day} not covered");
            day = day.succ_opt().expect("next day");
        }
    }

    #[test]
    fn resolve_is_case_insensitive_and_fails_closed() {
        let calendar = FiscalCalendar::default();
        let (quarter, range) = calendar.resolve(" q2 ").expect("q2 resolves");
        assert_eq!(quarter, Quarter::Q2);
        assert_eq!(range.start, date(2026, 5, 1));

        for bad in ["Q5", "", "first", "Q0"] {
            let error = calendar.resolve(bad).expect_err("unknown quarter");
            assert_eq!(error.kind(), "validation_error");
        }
    }

    #[test]
    fn gap_between_quarters_is_rejected() {
        let mut quarters = FiscalCalendar::default().quarters;
        quarters[1].start = date(2026, 5, 2);
        let error = FiscalCalendar::new("FY27", FiscalCalendar::default().year, quarters)
            .expect_err("gap");
        assert!(error.to_string().contains("fiscal.q2"));
    }

    #[test]
    fn overlap_and_short_year_are_rejected() {
        let base = FiscalCalendar::default();

        let mut overlapping = base.quarters;
        overlapping[2].start = date(2026, 7, 15);
        assert!(FiscalCalendar::new("FY27", base.year, overlapping).is_err());

        let mut short = base.quarters;
        short[3].end = date(2026, 12, 31);
        let error = FiscalCalendar::new("FY27", base.year, short).expect_err("short year");
        assert!(error.to_string().contains("fiscal.q4"));
    }

    #[test]
    fn soql_filter_is_inclusive() {
        let range = FiscalCalendar::default().quarter(Quarter::Q1);
        assert_eq!(range.soql_filter("CloseDate"), "CloseDate >= 2026-02-01 AND CloseDate <= 2026-04-30");
    }
}
