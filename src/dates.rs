//! Relative date periods ("next weekend", "this month") resolved against a
//! reference day.
//!
//! The table is rebuilt for every request from the caller's reference day.
//! Dates are civil dates: no timezone conversion happens here.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    ThisWeek,
    LastWeek,
    NextWeek,
    ThisWeekend,
    LastWeekend,
    NextWeekend,
    ThisMonth,
    LastMonth,
    NextMonth,
}

impl Period {
    pub const ALL: [Period; 10] = [
        Period::Today,
        Period::ThisWeek,
        Period::LastWeek,
        Period::NextWeek,
        Period::ThisWeekend,
        Period::LastWeekend,
        Period::NextWeekend,
        Period::ThisMonth,
        Period::LastMonth,
        Period::NextMonth,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::ThisWeek => "this_week",
            Period::LastWeek => "last_week",
            Period::NextWeek => "next_week",
            Period::ThisWeekend => "this_weekend",
            Period::LastWeekend => "last_weekend",
            Period::NextWeekend => "next_weekend",
            Period::ThisMonth => "this_month",
            Period::LastMonth => "last_month",
            Period::NextMonth => "next_month",
        }
    }

    /// Maps a spoken phrase ("next weekend") to its period.
    pub fn from_phrase(phrase: &str) -> Option<Period> {
        let key = phrase.trim().to_lowercase().replace(' ', "_");
        Period::ALL.into_iter().find(|p| p.key() == key)
    }
}

/// Inclusive range of civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start_iso(&self) -> String {
        iso(self.start)
    }

    pub fn end_iso(&self) -> String {
        iso(self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_iso(), self.end_iso())
    }
}

/// Named periods for one reference day.
#[derive(Debug, Clone, Serialize)]
pub struct DateContext {
    today: NaiveDate,
    periods: Vec<(Period, DateRange)>,
}

impl DateContext {
    /// Computes every named period relative to `today`.
    ///
    /// Weeks start on Monday (ISO). A weekend is the Saturday and Sunday of a
    /// given week, so on a Saturday "this weekend" starts today and on a
    /// Sunday it started yesterday.
    pub fn resolve(today: NaiveDate) -> Self {
        let week_start = shift(today, -i64::from(today.weekday().num_days_from_monday()));
        let week = |offset: i64| {
            let start = shift(week_start, offset * 7);
            DateRange::new(start, shift(start, 6))
        };
        let weekend = |offset: i64| {
            let start = shift(week_start, offset * 7 + 5);
            DateRange::new(start, shift(start, 1))
        };
        let month = |offset: i32| {
            let (year, month) = add_months(today.year(), today.month(), offset);
            month_range(year, month).unwrap_or(DateRange::new(today, today))
        };

        let periods = vec![
            (Period::Today, DateRange::new(today, today)),
            (Period::ThisWeek, week(0)),
            (Period::LastWeek, week(-1)),
            (Period::NextWeek, week(1)),
            (Period::ThisWeekend, weekend(0)),
            (Period::LastWeekend, weekend(-1)),
            (Period::NextWeekend, weekend(1)),
            (Period::ThisMonth, month(0)),
            (Period::LastMonth, month(-1)),
            (Period::NextMonth, month(1)),
        ];

        Self { today, periods }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn range(&self, period: Period) -> DateRange {
        self.periods
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, r)| *r)
            .unwrap_or(DateRange::new(self.today, self.today))
    }

    /// `(key, start, end)` rows in a fixed order, for prompts and display.
    pub fn table(&self) -> Vec<(&'static str, String, String)> {
        self.periods
            .iter()
            .map(|(p, r)| (p.key(), r.start_iso(), r.end_iso()))
            .collect()
    }

    /// Day offset from the reference day, e.g. `-1` for yesterday.
    pub fn day(&self, offset: i64) -> NaiveDate {
        shift(self.today, offset)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// First and last day of a calendar month. `None` for a month outside 1..=12.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some(DateRange::new(start, end))
}

/// Strict `YYYY-MM-DD`.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let moved = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    moved.unwrap_or(date)
}

fn add_months(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + offset;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        parse_iso(s).unwrap()
    }

    fn bounds(ctx: &DateContext, period: Period) -> (String, String) {
        let r = ctx.range(period);
        (r.start_iso(), r.end_iso())
    }

    #[test]
    fn test_saturday_weekend_starts_today() {
        let ctx = DateContext::resolve(date("2024-09-14"));
        assert_eq!(
            bounds(&ctx, Period::ThisWeekend),
            ("2024-09-14".into(), "2024-09-15".into())
        );
        assert_eq!(
            bounds(&ctx, Period::NextWeekend),
            ("2024-09-21".into(), "2024-09-22".into())
        );
        assert_eq!(
            bounds(&ctx, Period::LastWeekend),
            ("2024-09-07".into(), "2024-09-08".into())
        );
    }

    #[test]
    fn test_weeks_start_on_monday() {
        let ctx = DateContext::resolve(date("2024-09-12"));
        assert_eq!(
            bounds(&ctx, Period::ThisWeek),
            ("2024-09-09".into(), "2024-09-15".into())
        );
        assert_eq!(
            bounds(&ctx, Period::LastWeek),
            ("2024-09-02".into(), "2024-09-08".into())
        );
        assert_eq!(
            bounds(&ctx, Period::NextWeek),
            ("2024-09-16".into(), "2024-09-22".into())
        );
        assert_eq!(
            bounds(&ctx, Period::ThisWeekend),
            ("2024-09-14".into(), "2024-09-15".into())
        );
    }

    #[test]
    fn test_sunday_belongs_to_current_week() {
        let ctx = DateContext::resolve(date("2024-09-15"));
        assert_eq!(
            bounds(&ctx, Period::ThisWeek),
            ("2024-09-09".into(), "2024-09-15".into())
        );
        assert_eq!(
            bounds(&ctx, Period::ThisWeekend),
            ("2024-09-14".into(), "2024-09-15".into())
        );
    }

    #[test]
    fn test_month_rollover_across_years() {
        let ctx = DateContext::resolve(date("2024-12-20"));
        assert_eq!(
            bounds(&ctx, Period::NextMonth),
            ("2025-01-01".into(), "2025-01-31".into())
        );
        let ctx = DateContext::resolve(date("2024-01-05"));
        assert_eq!(
            bounds(&ctx, Period::LastMonth),
            ("2023-12-01".into(), "2023-12-31".into())
        );
        assert_eq!(
            bounds(&ctx, Period::NextMonth),
            ("2024-02-01".into(), "2024-02-29".into())
        );
    }

    #[rstest]
    #[case(2024, 2, 29)]
    #[case(2023, 2, 28)]
    #[case(2000, 2, 29)]
    #[case(1900, 2, 28)]
    #[case(2024, 4, 30)]
    #[case(2024, 12, 31)]
    fn test_days_in_month(#[case] year: i32, #[case] month: u32, #[case] days: u32) {
        assert_eq!(days_in_month(year, month), days);
    }

    #[test]
    fn test_month_range_rejects_bad_month() {
        assert!(month_range(2024, 0).is_none());
        assert!(month_range(2024, 13).is_none());
    }

    #[test]
    fn test_period_from_phrase() {
        assert_eq!(Period::from_phrase("next weekend"), Some(Period::NextWeekend));
        assert_eq!(Period::from_phrase("This Month"), Some(Period::ThisMonth));
        assert_eq!(Period::from_phrase("someday"), None);
    }

    #[test]
    fn test_table_is_complete_and_ordered() {
        let ctx = DateContext::resolve(date("2026-10-15"));
        let table = ctx.table();
        assert_eq!(table.len(), Period::ALL.len());
        assert_eq!(table[0], ("today", "2026-10-15".into(), "2026-10-15".into()));
    }

    #[test]
    fn test_parse_iso_is_strict() {
        assert!(parse_iso("2024-02-30").is_none());
        assert!(parse_iso("2024-9-1").is_none());
        assert_eq!(parse_iso("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
    }
}
