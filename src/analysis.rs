//! Summaries over retrieved games: one team's record, and aggregate
//! counts by month, venue and team.
//!
//! Games whose scores are missing or not whole numbers are left out of
//! every score-based figure. That is never an error.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::filter::Field;
use crate::record::{GameRecord, Side};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub team: String,
    pub wins: Vec<GameRecord>,
    pub losses: Vec<GameRecord>,
    pub draws: Vec<GameRecord>,
    /// Games the team played that had usable scores.
    pub total: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub draw_count: usize,
}

pub fn analyze(records: &[GameRecord], team: &str) -> AnalysisResult {
    let mut result = AnalysisResult {
        team: team.to_string(),
        ..Default::default()
    };

    for game in records {
        let Some(side) = game.side_of(team) else {
            continue;
        };
        let Some((home, away)) = game.scores() else {
            tracing::debug!(
                home = %game.home_score,
                away = %game.away_score,
                "skipping game without usable scores"
            );
            continue;
        };
        let (ours, theirs) = match side {
            Side::Home => (home, away),
            Side::Away => (away, home),
        };
        match ours.cmp(&theirs) {
            Ordering::Greater => result.wins.push(game.clone()),
            Ordering::Less => result.losses.push(game.clone()),
            Ordering::Equal => result.draws.push(game.clone()),
        }
    }

    result.win_count = result.wins.len();
    result.loss_count = result.losses.len();
    result.draw_count = result.draws.len();
    result.total = result.win_count + result.loss_count + result.draw_count;
    result
}

/// Games per calendar month, keyed `YYYY-MM`, oldest first.
pub fn month_counts(records: &[GameRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for date in records.iter().filter_map(GameRecord::parsed_date) {
        *counts.entry(date.format("%Y-%m").to_string()).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Games per venue, busiest first.
pub fn venue_counts(records: &[GameRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for venue in records.iter().filter_map(|g| g.field(Field::Venue)) {
        *counts.entry(venue).or_default() += 1;
    }
    let mut items: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(venue, count)| (venue.to_string(), count))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamLine {
    pub team: String,
    pub games: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u64,
    pub goals_against: u64,
}

impl TeamLine {
    fn record(&mut self, scored: u32, conceded: u32) {
        self.games += 1;
        self.goals_for = self.goals_for.saturating_add(u64::from(scored));
        self.goals_against = self.goals_against.saturating_add(u64::from(conceded));
        match scored.cmp(&conceded) {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.draws += 1,
        }
    }

    fn goal_difference(&self) -> i128 {
        i128::from(self.goals_for) - i128::from(self.goals_against)
    }
}

/// One line per team, ordered by wins, then goal difference, then name.
pub fn team_table(records: &[GameRecord]) -> Vec<TeamLine> {
    let mut lines: BTreeMap<&str, TeamLine> = BTreeMap::new();
    for game in records {
        let Some((home, away)) = game.scores() else {
            continue;
        };
        for (team, scored, conceded) in [
            (game.home_team.trim(), home, away),
            (game.away_team.trim(), away, home),
        ] {
            if team.is_empty() {
                continue;
            }
            lines
                .entry(team)
                .or_insert_with(|| TeamLine {
                    team: team.to_string(),
                    ..Default::default()
                })
                .record(scored, conceded);
        }
    }

    let mut table: Vec<TeamLine> = lines.into_values().collect();
    table.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
            .then_with(|| a.team.cmp(&b.team))
    });
    table
}

/// Short observations about a result set, e.g. `Top scorer: Arsenal with 7 goals`.
pub fn insights(records: &[GameRecord]) -> Vec<String> {
    let mut out = Vec::new();
    let table = team_table(records);

    if let Some(top) = leader(&table, |line| line.goals_for) {
        out.push(format!("Top scorer: {} with {} goals", top.team, top.goals_for));
    }
    if let Some(top) = leader(&table, |line| line.wins as u64) {
        out.push(format!("Most wins: {} with {} wins", top.team, top.wins));
    }
    if let Some((venue, count)) = venue_counts(records).first() {
        out.push(format!("Most games at: {} ({} games)", venue, count));
    }
    out
}

/// Highest `key`; alphabetical order breaks ties.
fn leader(table: &[TeamLine], key: impl Fn(&TeamLine) -> u64) -> Option<&TeamLine> {
    table
        .iter()
        .min_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.team.cmp(&b.team)))
}

/// Everything the formatter shows beneath the hit list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub months: Vec<(String, usize)>,
    pub venues: Vec<(String, usize)>,
    pub teams: Vec<TeamLine>,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<AnalysisResult>,
}

pub fn summarize(records: &[GameRecord], subject_team: Option<&str>) -> Summary {
    Summary {
        months: month_counts(records),
        venues: venue_counts(records),
        teams: team_table(records),
        insights: insights(records),
        team: subject_team.map(|team| analyze(records, team)),
    }
}
