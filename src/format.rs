use std::fmt::Write as _;

use crate::analysis::{AnalysisResult, Summary};
use crate::backend::SearchHit;
use crate::interpret::{InterpretationResult, Mode};
use crate::pipeline::Outcome;

const SHOWN_MONTHS: usize = 12;
const SHOWN_TEAMS: usize = 5;

/// Plain-text report for one query.
pub fn render(outcome: &Outcome) -> String {
    let mut out = String::new();
    render_interpretation(&mut out, &outcome.interpretation);
    out.push('\n');

    if outcome.hits.is_empty() {
        out.push_str("No games found.\n");
    } else {
        let _ = writeln!(out, "{} game(s) found:", outcome.hits.len());
        for hit in &outcome.hits {
            let _ = writeln!(out, "  {}", hit_line(hit));
        }
        render_summary(&mut out, &outcome.summary);
    }

    let tips = suggestions(&outcome.query, &outcome.interpretation, outcome.hits.len());
    if !tips.is_empty() {
        out.push('\n');
        out.push_str("Suggestions:\n");
        for tip in tips {
            let _ = writeln!(out, "  - {}", tip);
        }
    }
    out
}

fn render_interpretation(out: &mut String, interpretation: &InterpretationResult) {
    let _ = writeln!(out, "Intent: {}", interpretation.intent);
    let _ = writeln!(out, "Mode: {}", interpretation.mode);
    match &interpretation.filter {
        Some(filter) => {
            let _ = writeln!(
                out,
                "Filter ({} conditions): {}",
                filter.leaves().len(),
                filter.describe()
            );
        }
        None => out.push_str("Filter: none\n"),
    }
    let _ = writeln!(out, "Explanation: {}", interpretation.explanation);
    if let Some(reason) = &interpretation.fallback_reason {
        let _ = writeln!(out, "Fallback reason: {}", reason);
    }
}

fn hit_line(hit: &SearchHit) -> String {
    let game = &hit.metadata;
    let score = match game.scores() {
        Some((home, away)) => format!("{}-{}", home, away),
        None => "vs".to_string(),
    };
    let mut line = format!("{} {} {}", game.home_team, score, game.away_team);
    let details: Vec<&str> = [game.date.as_str(), game.venue.as_str(), game.league.as_str()]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if !details.is_empty() {
        let _ = write!(line, " ({})", details.join(", "));
    }
    let _ = write!(line, "  [{}]", hit.path);
    line
}

fn render_summary(out: &mut String, summary: &Summary) {
    if let Some(team) = &summary.team {
        out.push('\n');
        out.push_str(&team_record(team));
        out.push('\n');
    }

    if summary.months.len() > 1 {
        out.push_str("\nGames by month:\n");
        for (month, count) in summary.months.iter().take(SHOWN_MONTHS) {
            let _ = writeln!(out, "  {}: {}", month, count);
        }
    }

    if summary.teams.len() > 1 {
        out.push_str("\nStandings:\n");
        for line in summary.teams.iter().take(SHOWN_TEAMS) {
            let _ = writeln!(
                out,
                "  {}  P{} W{} D{} L{} GF{} GA{}",
                line.team,
                line.games,
                line.wins,
                line.draws,
                line.losses,
                line.goals_for,
                line.goals_against
            );
        }
    }

    if !summary.insights.is_empty() {
        let _ = writeln!(out, "\nInsights: {}", summary.insights.join(" | "));
    }
}

pub fn team_record(team: &AnalysisResult) -> String {
    if team.total == 0 {
        return format!("{}: no games with recorded scores", team.team);
    }
    format!(
        "{}: {} won, {} drawn, {} lost ({} games with scores)",
        team.team, team.win_count, team.draw_count, team.loss_count, team.total
    )
}

/// Follow-up hints keyed to the words the query used.
pub fn suggestions(query: &str, interpretation: &InterpretationResult, hits: usize) -> Vec<String> {
    let query = query.to_lowercase();
    let mut tips = Vec::new();

    if hits == 0 && interpretation.mode != Mode::Semantic {
        tips.push("Try removing a filter, e.g. drop the date or venue".to_string());
    }
    if mentions(&query, &["team", "teams"]) {
        tips.push("Try filtering by specific teams like 'Manchester United games'".to_string());
    }
    if mentions(&query, &["venue", "stadium", "ground"]) {
        tips.push("Try filtering by specific venues like 'games at Old Trafford'".to_string());
    }
    if mentions(&query, &["date", "time", "when"]) {
        tips.push("Try filtering by dates like 'games this week' or 'August games'".to_string());
    }
    if mentions(&query, &["score", "goals"]) {
        tips.push("Try filtering by score patterns like 'high scoring games' or '2-1'".to_string());
    }
    if hits > 5 {
        tips.push("Try narrowing your search with more specific criteria".to_string());
    }
    tips
}

fn mentions(query: &str, words: &[&str]) -> bool {
    words.iter().any(|w| query.contains(w))
}
