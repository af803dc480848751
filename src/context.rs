use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Everything one query needs besides its text. Built fresh per invocation
/// and passed down explicitly; nothing here is shared between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestContext {
    pub collection: String,
    pub k: usize,
    /// Reference day for relative dates.
    pub today: NaiveDate,
    /// Year that month names and "14th september" resolve into.
    pub season_year: i32,
    /// Explicit range from the caller; replaces any date in the query text.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Team whose results are summarised, when the caller names one.
    pub subject_team: Option<String>,
}

impl RequestContext {
    pub fn new(collection: impl Into<String>, k: usize, today: NaiveDate) -> Self {
        Self {
            collection: collection.into(),
            k,
            today,
            season_year: today.year(),
            date_range: None,
            subject_team: None,
        }
    }
}
