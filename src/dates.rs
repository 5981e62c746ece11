use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::CostError;

const RANGE_SEPARATOR: &str = " to ";
const INPUT_FORMAT: &str = "%d-%m-%y";

/// Inclusive start / exclusive end date pair, as Cost Explorer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse the literal CLI format `dd-mm-yy to dd-mm-yy`.
    pub fn parse(input: &str) -> Result<Self, CostError> {
        let (start, end) = input.split_once(RANGE_SEPARATOR).ok_or_else(|| {
            CostError::InvalidInput(format!(
                "invalid date range '{input}': expected 'dd-mm-yy to dd-mm-yy'"
            ))
        })?;

        let start = parse_date(start.trim())?;
        let end = parse_date(end.trim())?;

        if end < start {
            return Err(CostError::InvalidInput(format!(
                "invalid date range '{input}': end date precedes start date"
            )));
        }

        Ok(Self { start, end })
    }

    /// The trailing window ending at `today`, used by the 30-day reports.
    pub fn last_days(days: i64, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    pub fn start_ymd(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_ymd(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Short column label, e.g. "Jan 2025".
    pub fn label(&self) -> String {
        self.start.format("%b %Y").to_string()
    }

    /// Human-readable span, e.g. "01 Jan 2025 - 31 Jan 2025".
    pub fn describe(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%d %b %Y"),
            self.end.format("%d %b %Y")
        )
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, CostError> {
    NaiveDate::parse_from_str(input, INPUT_FORMAT)
        .map_err(|e| CostError::InvalidInput(format!("invalid date '{input}': {e}")))
}

/// Convert a chrono UTC timestamp to the SDK's DateTime.
pub fn to_smithy(dt: DateTime<Utc>) -> aws_smithy_types::DateTime {
    aws_smithy_types::DateTime::from_secs(dt.timestamp())
}

/// Convert an SDK DateTime to chrono UTC. Out-of-range values yield None.
pub fn from_smithy(dt: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_range() {
        let range = DateRange::parse("01-01-25 to 31-01-25").unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(range.start_ymd(), "2025-01-01");
        assert_eq!(range.end_ymd(), "2025-01-31");
        assert_eq!(range.label(), "Jan 2025");
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let range = DateRange::parse("01-12-24 to  31-12-24").unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_missing_separator() {
        let err = DateRange::parse("01-01-25 until 31-01-25").unwrap_err();
        assert!(matches!(err, CostError::InvalidInput(_)));
        assert!(err.to_string().contains("dd-mm-yy to dd-mm-yy"));
    }

    #[test]
    fn test_parse_unparseable_date() {
        let err = DateRange::parse("2025-01-01 to 2025-01-31").unwrap_err();
        assert!(matches!(err, CostError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_reversed_range() {
        let err = DateRange::parse("31-01-25 to 01-01-25").unwrap_err();
        assert!(err.to_string().contains("end date precedes start date"));
    }

    #[test]
    fn test_last_days_window() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let range = DateRange::last_days(30, today);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(range.end, today);
    }

    #[test]
    fn test_smithy_round_trip() {
        let now = DateTime::from_timestamp(1_735_689_600, 0).unwrap();
        let smithy = to_smithy(now);
        assert_eq!(from_smithy(&smithy), Some(now));
    }
}
