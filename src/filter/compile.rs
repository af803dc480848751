//! Extracted entities to a single backend filter.
//!
//! Categories compile in a fixed order (team, venue, date, score, status,
//! league) and the per-category clauses are ANDed. The backend compares
//! strings exactly, so names are normalized here and venues are expanded into
//! every casing they are likely stored under.

use chrono::NaiveDate;
use serde::Serialize;

use super::ast::{Field, FilterExpr, FilterValue, Operator};
use crate::dates::{self, DateContext, DateRange, Period};
use crate::extract::{month_number, Category, ExtractedEntities};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTag {
    HighScoring,
    LowScoring,
    Goalless,
    Draw,
    Result,
    Scoreline(u32, u32),
}

impl ScoreTag {
    pub fn parse(tag: &str) -> Option<ScoreTag> {
        match tag {
            "high_scoring" => Some(ScoreTag::HighScoring),
            "low_scoring" => Some(ScoreTag::LowScoring),
            "goalless" => Some(ScoreTag::Goalless),
            "draw" => Some(ScoreTag::Draw),
            "result" => Some(ScoreTag::Result),
            other => {
                let (home, away) = other.split_once('-')?;
                Some(ScoreTag::Scoreline(home.parse().ok()?, away.parse().ok()?))
            }
        }
    }
}

/// A caller-supplied range after ordering its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrectedRange {
    pub range: DateRange,
    pub corrected: bool,
}

/// Swaps the bounds when `start` is after `end`. Never fails.
pub fn correct_range(start: NaiveDate, end: NaiveDate) -> CorrectedRange {
    if start > end {
        CorrectedRange {
            range: DateRange::new(end, start),
            corrected: true,
        }
    } else {
        CorrectedRange {
            range: DateRange::new(start, end),
            corrected: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Compiled {
    pub filter: Option<FilterExpr>,
    /// Categories that produced a clause, in compilation order.
    pub applied: Vec<String>,
    /// An explicit date range arrived inverted and was swapped.
    pub range_corrected: bool,
    /// Things the query asked for that no backend clause can express.
    pub notes: Vec<String>,
}

pub struct FilterCompiler<'a> {
    dates: &'a DateContext,
    season_year: i32,
    explicit_range: Option<(NaiveDate, NaiveDate)>,
}

impl<'a> FilterCompiler<'a> {
    /// `season_year` anchors month names and day-month expressions.
    pub fn new(dates: &'a DateContext, season_year: i32) -> Self {
        Self {
            dates,
            season_year,
            explicit_range: None,
        }
    }

    /// An explicit range replaces whatever date the query text mentions.
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.explicit_range = Some((start, end));
        self
    }

    pub fn compile(&self, entities: &ExtractedEntities) -> Compiled {
        let mut out = Compiled::default();
        let mut clauses = Vec::new();

        for category in Category::ALL {
            let values = entities.get(category);
            let clause = match category {
                Category::Team => team_filter(values),
                Category::Venue => venue_filter(values),
                Category::Date => self.date_clause(values, &mut out),
                Category::Score => score_clause(values, &mut out.notes),
                Category::Status => value_filter(Field::Status, values),
                Category::League => value_filter(Field::League, values),
            };
            if let Some(clause) = clause {
                out.applied.push(category.to_string());
                clauses.push(clause);
            }
        }

        out.filter = combine(clauses);
        tracing::debug!(filter = ?out.filter, corrected = out.range_corrected, "compiled filter");
        out
    }

    fn date_clause(&self, values: &[String], out: &mut Compiled) -> Option<FilterExpr> {
        if let Some((start, end)) = self.explicit_range {
            return Some(self.corrected(start, end, out));
        }

        let explicit: Vec<NaiveDate> = values.iter().filter_map(|v| dates::parse_iso(v)).collect();
        if let [start, end, ..] = explicit[..] {
            return Some(self.corrected(start, end, out));
        }

        values.iter().find_map(|v| self.resolve_date(v))
    }

    fn corrected(&self, start: NaiveDate, end: NaiveDate, out: &mut Compiled) -> FilterExpr {
        let fixed = correct_range(start, end);
        if fixed.corrected {
            tracing::info!(%start, %end, "date range was inverted, swapping bounds");
            out.range_corrected = true;
        }
        range_filter(fixed.range)
    }

    fn resolve_date(&self, expression: &str) -> Option<FilterExpr> {
        match expression {
            "yesterday" => return Some(day_filter(self.dates.day(-1))),
            "tomorrow" => return Some(day_filter(self.dates.day(1))),
            _ => {}
        }
        if let Some(period) = Period::from_phrase(expression) {
            return Some(range_filter(self.dates.range(period)));
        }
        if let Some(day) = dates::parse_iso(expression) {
            return Some(day_filter(day));
        }
        if let Some(month) = month_number(expression) {
            return month_filter(month, self.season_year);
        }
        self.day_of_month(expression).map(day_filter)
    }

    /// "14th september", "3 of sep".
    fn day_of_month(&self, expression: &str) -> Option<NaiveDate> {
        let mut words = expression.split_whitespace();
        let day: u32 = words
            .next()?
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .ok()?;
        let month = words.filter(|w| *w != "of").find_map(month_number)?;
        NaiveDate::from_ymd_opt(self.season_year, month, day)
    }
}

/// `[]` is no filter, `[f]` is `f` unwrapped, anything longer is `And`.
pub fn combine(mut clauses: Vec<FilterExpr>) -> Option<FilterExpr> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(FilterExpr::And(clauses)),
    }
}

/// A team plays either side, so every team contributes a home and an away leaf.
pub fn team_filter<S: AsRef<str>>(teams: &[S]) -> Option<FilterExpr> {
    if teams.is_empty() {
        return None;
    }
    let leaves = teams
        .iter()
        .flat_map(|team| {
            let name = title_case(team.as_ref().trim());
            [
                FilterExpr::eq(Field::HomeTeam, name.clone()),
                FilterExpr::eq(Field::AwayTeam, name),
            ]
        })
        .collect();
    Some(FilterExpr::Or(leaves))
}

pub fn venue_filter<S: AsRef<str>>(venues: &[S]) -> Option<FilterExpr> {
    if venues.is_empty() {
        return None;
    }
    let mut variants = Vec::new();
    for venue in venues {
        for variant in venue_variants(venue.as_ref()) {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }
    Some(FilterExpr::one_of(Field::Venue, variants))
}

/// Casings a venue may be stored under, first occurrence kept.
pub fn venue_variants(venue: &str) -> Vec<String> {
    let venue = venue.trim();
    let lower = venue.to_lowercase();
    let mut candidates = vec![
        title_case(venue),
        lower.clone(),
        venue.to_uppercase(),
        capitalize(venue),
        venue.to_string(),
    ];

    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() > 1 {
        for i in 0..words.len() {
            let mixed: Vec<String> = words
                .iter()
                .enumerate()
                .map(|(j, w)| if i == j { title_case(w) } else { (*w).to_string() })
                .collect();
            candidates.push(mixed.join(" "));
        }
    }

    let mut variants = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// `Leaf(field, eq, v)` for one value, `Leaf(field, in, vs)` for several.
pub fn value_filter<S: AsRef<str>>(field: Field, values: &[S]) -> Option<FilterExpr> {
    let mut normalized: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = capitalize_words(value.as_ref().trim());
        if !normalized.contains(&value) {
            normalized.push(value);
        }
    }
    match normalized.len() {
        0 => None,
        1 => normalized.pop().map(|v| FilterExpr::eq(field, v)),
        _ => Some(FilterExpr::leaf(field, Operator::In, FilterValue::Many(normalized))),
    }
}

/// First to last day of the month, as two sibling leaves.
pub fn month_filter(month: u32, year: i32) -> Option<FilterExpr> {
    dates::month_range(year, month).map(range_filter)
}

/// A single-day range collapses to one `eq` leaf.
pub fn range_filter(range: DateRange) -> FilterExpr {
    if range.start == range.end {
        return day_filter(range.start);
    }
    FilterExpr::And(vec![
        FilterExpr::cmp(Field::Date, Operator::Gte, range.start_iso()),
        FilterExpr::cmp(Field::Date, Operator::Lte, range.end_iso()),
    ])
}

pub fn day_filter(day: NaiveDate) -> FilterExpr {
    FilterExpr::eq(Field::Date, dates::iso(day))
}

/// Scores are string-typed in the backend, so thresholds are strings too.
pub fn score_filter(tag: ScoreTag) -> Option<FilterExpr> {
    let both = |op: Operator, home: String, away: String| {
        vec![
            FilterExpr::cmp(Field::HomeScore, op, home),
            FilterExpr::cmp(Field::AwayScore, op, away),
        ]
    };
    match tag {
        ScoreTag::HighScoring => Some(FilterExpr::Or(both(Operator::Gte, "3".into(), "3".into()))),
        ScoreTag::LowScoring => Some(FilterExpr::And(both(Operator::Lte, "1".into(), "1".into()))),
        ScoreTag::Goalless => Some(FilterExpr::And(both(Operator::Eq, "0".into(), "0".into()))),
        ScoreTag::Scoreline(h, a) => {
            Some(FilterExpr::And(both(Operator::Eq, h.to_string(), a.to_string())))
        }
        ScoreTag::Draw | ScoreTag::Result => None,
    }
}

fn score_clause(tags: &[String], notes: &mut Vec<String>) -> Option<FilterExpr> {
    let mut clause = None;
    for tag in tags.iter().filter_map(|t| ScoreTag::parse(t)) {
        match tag {
            ScoreTag::Draw => notes.push("draws are classified after retrieval".to_string()),
            ScoreTag::Result => {
                notes.push("wins and losses are classified after retrieval".to_string())
            }
            _ if clause.is_none() => clause = score_filter(tag),
            _ => {}
        }
    }
    clause
}

/// Python-style title case: every letter after a non-letter is upper-cased,
/// every other letter lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper-cases the first letter of each word and leaves the rest untouched,
/// so "premier league" and "FA Cup" both come out right.
fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PatternExtractor;
    use rstest::rstest;
    use std::collections::HashSet;

    fn day(s: &str) -> NaiveDate {
        dates::parse_iso(s).unwrap()
    }

    fn date_leaves(op_start: &str, op_end: &str) -> FilterExpr {
        FilterExpr::And(vec![
            FilterExpr::cmp(Field::Date, Operator::Gte, op_start),
            FilterExpr::cmp(Field::Date, Operator::Lte, op_end),
        ])
    }

    fn compile_query(query: &str, today: &str) -> Compiled {
        let ctx = DateContext::resolve(day(today));
        let entities = PatternExtractor::new().unwrap().extract(query);
        FilterCompiler::new(&ctx, 2024).compile(&entities)
    }

    #[rstest]
    #[case(1, 2024, "2024-01-31")]
    #[case(2, 2024, "2024-02-29")]
    #[case(2, 2023, "2023-02-28")]
    #[case(2, 2000, "2000-02-29")]
    #[case(2, 1900, "1900-02-28")]
    #[case(3, 2024, "2024-03-31")]
    #[case(4, 2024, "2024-04-30")]
    #[case(5, 2024, "2024-05-31")]
    #[case(6, 2024, "2024-06-30")]
    #[case(7, 2024, "2024-07-31")]
    #[case(8, 2024, "2024-08-31")]
    #[case(9, 2024, "2024-09-30")]
    #[case(10, 2024, "2024-10-31")]
    #[case(11, 2024, "2024-11-30")]
    #[case(12, 2024, "2024-12-31")]
    fn test_month_filter_bounds(#[case] month: u32, #[case] year: i32, #[case] last: &str) {
        let first = format!("{}-{:02}-01", year, month);
        assert_eq!(month_filter(month, year), Some(date_leaves(&first, last)));
    }

    #[test]
    fn test_combine_arity() {
        let f = FilterExpr::eq(Field::Status, "Completed");
        let g = FilterExpr::eq(Field::League, "Premier League");
        assert_eq!(combine(vec![]), None);
        assert_eq!(combine(vec![f.clone()]), Some(f.clone()));
        assert_eq!(combine(vec![f.clone(), g.clone()]), Some(FilterExpr::And(vec![f, g])));
    }

    #[test]
    fn test_team_filter_title_cases() {
        assert_eq!(
            team_filter(&["liverpool"]),
            Some(FilterExpr::Or(vec![
                FilterExpr::eq(Field::HomeTeam, "Liverpool"),
                FilterExpr::eq(Field::AwayTeam, "Liverpool"),
            ]))
        );
    }

    #[test]
    fn test_multiple_teams_share_one_or() {
        let Some(FilterExpr::Or(leaves)) = team_filter(&["arsenal", "chelsea"]) else {
            panic!("expected Or");
        };
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[2], FilterExpr::eq(Field::HomeTeam, "Chelsea"));
    }

    #[test]
    fn test_venue_variants_single_word() {
        let Some(FilterExpr::Leaf(c)) = venue_filter(&["anfield"]) else {
            panic!("expected leaf");
        };
        assert_eq!(c.op, Operator::In);
        let FilterValue::Many(values) = c.value else {
            panic!("expected list");
        };
        for expected in ["Anfield", "anfield", "ANFIELD"] {
            assert!(values.iter().any(|v| v == expected), "missing {}", expected);
        }
        let unique: HashSet<&String> = values.iter().collect();
        assert_eq!(unique.len(), values.len());
    }

    #[test]
    fn test_venue_variants_multi_word() {
        assert_eq!(
            venue_variants("old trafford"),
            ["Old Trafford", "old trafford", "OLD TRAFFORD", "Old trafford", "old Trafford"]
        );
    }

    #[test]
    fn test_correct_range() {
        let fixed = correct_range(day("2024-09-15"), day("2024-08-03"));
        assert!(fixed.corrected);
        assert_eq!(fixed.range.start_iso(), "2024-08-03");
        assert_eq!(fixed.range.end_iso(), "2024-09-15");

        let kept = correct_range(day("2024-08-03"), day("2024-09-15"));
        assert!(!kept.corrected);
        assert_eq!(kept.range, fixed.range);
    }

    #[test]
    fn test_no_entities_no_filter() {
        let compiled = compile_query("show me something interesting", "2024-09-12");
        assert_eq!(compiled.filter, None);
        assert!(compiled.applied.is_empty());
    }

    #[test]
    fn test_single_clause_not_wrapped() {
        let compiled = compile_query("goalless games", "2024-09-12");
        assert_eq!(
            compiled.filter,
            Some(FilterExpr::And(vec![
                FilterExpr::eq(Field::HomeScore, "0"),
                FilterExpr::eq(Field::AwayScore, "0"),
            ]))
        );
        assert_eq!(compiled.applied, ["score"]);
    }

    #[test]
    fn test_categories_are_anded_in_order() {
        let compiled = compile_query("liverpool at anfield in september", "2024-09-12");
        let Some(FilterExpr::And(clauses)) = compiled.filter else {
            panic!("expected And");
        };
        assert_eq!(clauses.len(), 3);
        assert!(matches!(clauses[0], FilterExpr::Or(_)));
        assert!(matches!(clauses[1], FilterExpr::Leaf(_)));
        assert_eq!(clauses[2], date_leaves("2024-09-01", "2024-09-30"));
        assert_eq!(compiled.applied, ["team", "venue", "date"]);
    }

    #[test]
    fn test_relative_period_uses_context() {
        let compiled = compile_query("games next weekend", "2024-09-12");
        assert_eq!(compiled.filter, Some(date_leaves("2024-09-21", "2024-09-22")));
    }

    #[test]
    fn test_today_is_single_leaf() {
        let compiled = compile_query("who plays tonight", "2024-09-14");
        assert_eq!(compiled.filter, Some(FilterExpr::eq(Field::Date, "2024-09-14")));
    }

    #[test]
    fn test_day_of_month_uses_season_year() {
        let compiled = compile_query("results from 14th september", "2026-10-15");
        assert_eq!(compiled.filter, Some(FilterExpr::eq(Field::Date, "2024-09-14")));
    }

    #[test]
    fn test_inverted_iso_range_is_corrected() {
        let compiled = compile_query("between 2024-09-15 and 2024-08-03", "2024-09-12");
        assert!(compiled.range_corrected);
        assert_eq!(compiled.filter, Some(date_leaves("2024-08-03", "2024-09-15")));
    }

    #[test]
    fn test_explicit_range_overrides_text() {
        let ctx = DateContext::resolve(day("2024-09-12"));
        let entities = PatternExtractor::new().unwrap().extract("games next week");
        let compiled = FilterCompiler::new(&ctx, 2024)
            .with_range(day("2024-08-10"), day("2024-08-01"))
            .compile(&entities);
        assert!(compiled.range_corrected);
        assert_eq!(compiled.filter, Some(date_leaves("2024-08-01", "2024-08-10")));
    }

    #[test]
    fn test_draw_adds_note_not_clause() {
        let compiled = compile_query("arsenal draws", "2024-09-12");
        assert_eq!(compiled.applied, ["team"]);
        assert_eq!(compiled.notes.len(), 1);
    }

    #[test]
    fn test_status_and_league_values() {
        assert_eq!(
            value_filter(Field::League, &["premier league"]),
            Some(FilterExpr::eq(Field::League, "Premier League"))
        );
        assert_eq!(
            value_filter(Field::Status, &["completed", "scheduled"]),
            Some(FilterExpr::leaf(
                Field::Status,
                Operator::In,
                FilterValue::Many(vec!["Completed".into(), "Scheduled".into()])
            ))
        );
        assert_eq!(value_filter::<&str>(Field::Status, &[]), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("st james' park"), "St James' Park");
        assert_eq!(title_case("MAN UTD"), "Man Utd");
        assert_eq!(capitalize("old TRAFFORD"), "Old trafford");
    }
}
