use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid date: '{0}'")]
    InvalidDate(String),

    #[error("inverted range: {from} is after {to}")]
    InvertedRange { from: MonthKey, to: MonthKey },

    #[error("unknown preset '{0}' (valid: current, last, 3m, 6m, 12m, custom)")]
    UnknownPreset(String),
}

const MONTH_NAMES: [(&str, &str); 12] = [
    ("january", "janeiro"),
    ("february", "fevereiro"),
    ("march", "março"),
    ("april", "abril"),
    ("may", "maio"),
    ("june", "junho"),
    ("july", "julho"),
    ("august", "agosto"),
    ("september", "setembro"),
    ("october", "outubro"),
    ("november", "novembro"),
    ("december", "dezembro"),
];

/// Canonical period identifier: a calendar month, always rendered as its
/// first day (`YYYY-MM-01`).
///
/// Field order matters: the derived `Ord` compares year first, so ordering
/// is chronological and matches the lexicographic order of the ISO keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PeriodError::InvalidDate(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed since year 0, used for month arithmetic.
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// The key `n` months after (`n > 0`) or before (`n < 0`) this one.
    pub fn shift(self, n: i32) -> Self {
        Self::from_ordinal(self.ordinal() + n as i64)
    }

    pub fn next(self) -> Self {
        self.shift(1)
    }

    pub fn prev(self) -> Self {
        self.shift(-1)
    }

    /// First day of the month as an ISO date string.
    pub fn as_iso(&self) -> String {
        self.to_string()
    }

    /// First day of the month, if representable as a calendar date.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last day of the month, if representable as a calendar date.
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.next().first_day().and_then(|d| d.pred_opt())
    }

    /// Whether `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// Lower-case long names, English and Portuguese: `march 2025`,
    /// `março de 2025`.
    pub fn long_names(&self) -> [String; 2] {
        let (en, pt) = MONTH_NAMES[(self.month - 1) as usize];
        [
            format!("{} {}", en, self.year),
            format!("{} de {}", pt, self.year),
        ]
    }

    /// Search match on the key prefix or, case-insensitively, on a long
    /// name. A blank query matches every month.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || self.to_string().starts_with(query) {
            return true;
        }
        let query = query.to_lowercase();
        self.long_names().iter().any(|name| name.contains(&query))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        to_month_key(&value)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_month_key(s)
    }
}

/// Normalize a date-like string to the month that contains it.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM`, RFC 3339 timestamps and naive
/// `YYYY-MM-DDTHH:MM:SS` timestamps.
pub fn to_month_key(input: &str) -> Result<MonthKey, PeriodError> {
    let input = input.trim();
    let invalid = || PeriodError::InvalidDate(input.to_string());

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(MonthKey::from_date(date));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(MonthKey::from_date(ts.date_naive()));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(MonthKey::from_date(ts.date()));
    }

    // Bare year-month, as produced by month pickers.
    let (year, month) = input.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    MonthKey::new(year, month).map_err(|_| invalid())
}

/// Number of calendar months spanned by two keys, both ends included.
/// Order-independent: `months_between_inclusive(a, b) == months_between_inclusive(b, a)`.
pub fn months_between_inclusive(from: MonthKey, to: MonthKey) -> u32 {
    (to.ordinal() - from.ordinal()).unsigned_abs() as u32 + 1
}
