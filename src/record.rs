use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dates;
use crate::filter::Field;

/// Metadata of one game as the search backend stores it. Every field is a
/// string; scores may be empty or non-numeric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub home_team: String,
    #[serde(deserialize_with = "lenient_string")]
    pub away_team: String,
    #[serde(deserialize_with = "lenient_string")]
    pub venue: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub league: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub home_score: String,
    #[serde(deserialize_with = "lenient_string")]
    pub away_score: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl GameRecord {
    /// Stored value of a filterable field; `None` when absent or blank.
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::HomeTeam => &self.home_team,
            Field::AwayTeam => &self.away_team,
            Field::Venue => &self.venue,
            Field::Date => &self.date,
            Field::League => &self.league,
            Field::Status => &self.status,
            Field::HomeScore => &self.home_score,
            Field::AwayScore => &self.away_score,
        };
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Both scores, or `None` if either is missing or not a whole number.
    pub fn scores(&self) -> Option<(u32, u32)> {
        let home = self.home_score.trim().parse().ok()?;
        let away = self.away_score.trim().parse().ok()?;
        Some((home, away))
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        dates::parse_iso(&self.date)
    }

    /// Which side `team` played on, compared case-insensitively.
    pub fn side_of(&self, team: &str) -> Option<Side> {
        let team = team.trim();
        if self.home_team.trim().eq_ignore_ascii_case(team) {
            Some(Side::Home)
        } else if self.away_team.trim().eq_ignore_ascii_case(team) {
            Some(Side::Away)
        } else {
            None
        }
    }
}

/// Strings, numbers and booleans all become text; null becomes empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn game(home: &str, away: &str, home_score: &str, away_score: &str) -> GameRecord {
    GameRecord {
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_score: home_score.to_string(),
        away_score: away_score.to_string(),
        ..GameRecord::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_scores_deserialize_as_text() {
        let record: GameRecord = serde_json::from_value(serde_json::json!({
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "home_score": 2,
            "away_score": "1",
            "type": "game"
        }))
        .unwrap();
        assert_eq!(record.home_score, "2");
        assert_eq!(record.scores(), Some((2, 1)));
        assert_eq!(record.venue, "");
        assert_eq!(record.field(Field::Venue), None);
    }

    #[test]
    fn test_unparseable_scores() {
        assert_eq!(game("A", "B", "abc", "1").scores(), None);
        assert_eq!(game("A", "B", "", "1").scores(), None);
        assert_eq!(game("A", "B", "-1", "1").scores(), None);
    }

    #[test]
    fn test_side_of() {
        let g = game("Arsenal", "Chelsea", "1", "1");
        assert_eq!(g.side_of("arsenal"), Some(Side::Home));
        assert_eq!(g.side_of("Chelsea "), Some(Side::Away));
        assert_eq!(g.side_of("Fulham"), None);
    }
}
