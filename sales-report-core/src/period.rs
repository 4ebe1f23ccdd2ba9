//! Reporting period and the request schema it is resolved from.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::error::ReportError;

/// Inclusive calendar-month range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportPeriod {
    /// Build the period for `month` of `year`, failing for months outside
    /// 1..=12 or years chrono cannot represent.
    pub fn for_month(year: i32, month: u32) -> Result<Self, ReportError> {
        let invalid = || ReportError::InvalidPeriod { year, month };

        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_month_start = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end = next_month_start.pred_opt().ok_or_else(invalid)?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `YYYY-MM-DD`, the form the store query binds.
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Blob name of the PDF artifact, e.g. `Reporte_3_2024.pdf`.
    pub fn pdf_blob_name(&self) -> String {
        format!("Reporte_{}_{}.pdf", self.month, self.year)
    }

    /// Blob name of the spreadsheet artifact, e.g. `Reporte_3_2024.xlsx`.
    pub fn spreadsheet_blob_name(&self) -> String {
        format!("Reporte_{}_{}.xlsx", self.month, self.year)
    }
}

/// Body of a report trigger. Both fields are optional and default to the
/// current date's year and month.
///
/// The Spanish field names `mes` and `año` used by existing callers are
/// accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportRequest {
    #[serde(default, alias = "año", alias = "ano")]
    pub year: Option<i32>,
    #[serde(default, alias = "mes")]
    pub month: Option<u32>,
}

impl ReportRequest {
    pub fn new(year: Option<i32>, month: Option<u32>) -> Self {
        Self { year, month }
    }

    /// Parse a raw trigger body. An empty body or a JSON `null` means
    /// "use the defaults".
    pub fn from_body(body: &[u8]) -> Result<Self, ReportError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_json::from_slice(body)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Resolve against `today`, filling whichever fields are absent.
    pub fn resolve(&self, today: NaiveDate) -> Result<ReportPeriod, ReportError> {
        let year = self.year.unwrap_or_else(|| today.year());
        let month = self.month.unwrap_or_else(|| today.month());
        ReportPeriod::for_month(year, month)
    }
}
