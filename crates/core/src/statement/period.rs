//! Time windows for statements and activity feeds.
//!
//! All windows are UTC and inclusive at both ends. The last instant of a day
//! is 23:59:59.999999, the finest resolution the database keeps.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::ledger::LedgerError;

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementPeriod {
    year: i32,
    month: u32,
}

impl StatementPeriod {
    /// Validates a year and month.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidRequest` for a month outside 1-12 or a month
    /// that does not end before the last date chrono can represent.
    pub fn new(year: i32, month: u32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidRequest(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        let in_range = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_months(chrono::Months::new(1)))
            .is_some();
        if !in_range {
            return Err(LedgerError::InvalidRequest(format!("year {year} is out of range")));
        }
        Ok(Self { year, month })
    }

    /// Builds a period from optional query parameters.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidRequest` if either part is missing or invalid.
    pub fn from_parts(year: Option<i32>, month: Option<u32>) -> Result<Self, LedgerError> {
        match (year, month) {
            (Some(year), Some(month)) => Self::new(year, month),
            _ => Err(LedgerError::InvalidRequest(
                "year and month are required".to_string(),
            )),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-12.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// First instant of the month.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        start_of_day(self.first_day())
    }

    /// Last instant of the month.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        end_of_day(self.last_day())
    }

    /// `M/YYYY`, as printed on statements.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.month, self.year)
    }

    /// `YYYY-MM`, for file names.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Optional inclusive date bounds for the activity feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityRange {
    /// First instant included.
    pub from: Option<DateTime<Utc>>,
    /// Last instant included.
    pub to: Option<DateTime<Utc>>,
}

impl ActivityRange {
    /// Covers whole days: `from` at 00:00 and `to` at the end of its day.
    #[must_use]
    pub fn from_dates(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            from: from.map(start_of_day),
            to: to.map(end_of_day),
        }
    }

    /// Parses `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidRequest` for an unparseable date or a range that
    /// ends before it starts.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, LedgerError> {
        let range = Self::from_dates(parse_date(from)?, parse_date(to)?);
        if let (Some(from), Some(to)) = (range.from, range.to)
            && to < from
        {
            return Err(LedgerError::InvalidRequest(
                "toDate must not be before fromDate".to_string(),
            ));
        }
        Ok(range)
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, LedgerError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .filter(|day| day.succ_opt().is_some())
                .ok_or_else(|| LedgerError::InvalidRequest(format!("invalid date: {v}")))
        })
        .transpose()
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// 23:59:59.999999 on `day`, without date arithmetic.
fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
        .map_or_else(|| start_of_day(day), |last| day.and_time(last).and_utc())
}
