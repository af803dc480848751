use std::fs;
use std::path::Path;

use crate::record::GameRecord;

/// Reads a game document. Markdown and text files carry the record in a
/// leading `---` block; `.yaml`/`.yml` files are the record itself.
/// Anything without a home or away team is not a game.
pub fn parse_game(path: &Path) -> Option<GameRecord> {
    let content = fs::read_to_string(path).ok()?;
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml");

    let yaml = if is_yaml {
        content.as_str()
    } else {
        front_matter(&content)?
    };
    parse_record(yaml)
}

fn front_matter(content: &str) -> Option<&str> {
    let rest = content
        .trim_start_matches('\u{feff}')
        .trim_start()
        .strip_prefix("---")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

fn parse_record(yaml: &str) -> Option<GameRecord> {
    let record: GameRecord = serde_yaml::from_str(yaml).ok()?;
    let has_team = !record.home_team.is_empty() || !record.away_team.is_empty();
    has_team.then_some(record)
}
