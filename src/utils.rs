use crate::error::{BudgetError, Result};
use crate::schema::ReportingPeriod;
use chrono::{Datelike, NaiveDate};

const MONTH_LABELS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

pub fn validate_month(month: u32, year: i32) -> Result<()> {
    ReportingPeriod::new(month, year).map(|_| ())
}

/// Portuguese month name, `None` outside 1-12.
pub fn month_label(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize))
        .copied()
}

/// Display title such as "Junho/2024".
pub fn period_title(period: ReportingPeriod) -> String {
    match month_label(period.month) {
        Some(label) => format!("{}/{}", label, period.year),
        None => format!("{:02}/{}", period.month, period.year),
    }
}

/// Steps `months` back from the given month, wrapping into earlier years.
pub fn months_before(year: i32, month: u32, months: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - months as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Ledgers are usually closed two months behind, so dashboards open on the
/// month two before `today`.
pub fn default_reporting_period(today: NaiveDate) -> ReportingPeriod {
    let (year, month) = months_before(today.year(), today.month(), 2);
    ReportingPeriod { month, year }
}

/// Parses "YYYY-MM" into a reporting period.
pub fn parse_period_string(period: &str) -> Result<ReportingPeriod> {
    let start = format!("{}-01", period.trim());
    let date = NaiveDate::parse_from_str(&start, "%Y-%m-%d").map_err(|_| {
        BudgetError::DateError(format!(
            "Invalid period format: {}. Expected YYYY-MM",
            period
        ))
    })?;
    ReportingPeriod::new(date.month(), date.year())
}
