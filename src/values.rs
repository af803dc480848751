use std::collections::HashMap;

use crate::filter::Field;
use crate::record::GameRecord;

/// Distinct stored values of `field`, exactly as written, with how often
/// each occurs. Useful for spotting inconsistent casing in a collection.
pub fn collect_values<'a>(
    games: impl IntoIterator<Item = &'a GameRecord>,
    field: Field,
) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in games.into_iter().filter_map(|game| game.field(field)) {
        *counts.entry(value.to_string()).or_default() += 1;
    }
    counts
}

pub fn format_values(counts: HashMap<String, usize>, show_count: bool) -> Vec<String> {
    let mut items: Vec<(String, usize)> = counts.into_iter().collect();

    if show_count {
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        items
            .into_iter()
            .map(|(val, count)| format!("{}: {}", val, count))
            .collect()
    } else {
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items.into_iter().map(|(val, _)| val).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::game;

    fn at(venue: &str) -> GameRecord {
        let mut g = game("A", "B", "1", "0");
        g.venue = venue.to_string();
        g
    }

    #[test]
    fn test_casing_variants_stay_distinct() {
        let games = vec![at("Anfield"), at("anfield"), at("Anfield"), at("")];
        let counts = collect_values(&games, Field::Venue);
        assert_eq!(counts.get("Anfield"), Some(&2));
        assert_eq!(counts.get("anfield"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_format_with_counts() {
        let games = vec![at("Anfield"), at("Old Trafford"), at("Old Trafford")];
        let lines = format_values(collect_values(&games, Field::Venue), true);
        assert_eq!(lines, ["Old Trafford: 2", "Anfield: 1"]);
    }

    #[test]
    fn test_format_sorted_without_counts() {
        let games = vec![game("Wolves", "Arsenal", "", ""), game("Chelsea", "Wolves", "", "")];
        let lines = format_values(collect_values(&games, Field::HomeTeam), false);
        assert_eq!(lines, ["Chelsea", "Wolves"]);
    }
}
