use async_trait::async_trait;
use chrono::Datelike;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use super::{BackendError, SearchBackend, SearchHit, SearchRequest, SearchResponse};
use crate::filter::evaluate;
use crate::frontmatter;
use crate::record::GameRecord;

const GAME_EXTENSIONS: [&str; 4] = ["md", "txt", "yaml", "yml"];

/// A directory of game documents filtered in process.
///
/// Matching follows the hosted backend's metadata semantics; there is no
/// relevance ranking, hits come back in path order with a score of 1.0.
pub struct LocalCollection {
    root: PathBuf,
    games: Vec<(PathBuf, GameRecord)>,
}

impl LocalCollection {
    pub fn load(root: &Path) -> Result<Self, BackendError> {
        let collection = Self::from_paths(root, collect_game_files(root));
        if collection.games.is_empty() {
            return Err(BackendError::EmptyCollection(root.display().to_string()));
        }
        Ok(collection)
    }

    /// Files that are not game documents are skipped.
    pub fn from_paths(root: &Path, mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        let games: Vec<(PathBuf, GameRecord)> = paths
            .into_iter()
            .filter_map(|path| {
                let game = frontmatter::parse_game(&path)?;
                Some((path, game))
            })
            .collect();
        tracing::debug!(root = %root.display(), games = games.len(), "loaded local collection");

        Self {
            root: root.to_path_buf(),
            games,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &GameRecord> {
        self.games.iter().map(|(_, game)| game)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[async_trait]
impl SearchBackend for LocalCollection {
    fn name(&self) -> &str {
        "local"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let results = self
            .games
            .iter()
            .filter(|(_, game)| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |filter| evaluate(filter, game))
            })
            .take(request.k)
            .map(|(path, game)| SearchHit {
                path: self.display_path(path),
                score: 1.0,
                metadata: game.clone(),
            })
            .collect();

        Ok(SearchResponse { results })
    }

    /// Most common year among the games; the later year wins a tie.
    fn season_year(&self) -> Option<i32> {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for date in self.records().filter_map(GameRecord::parsed_date) {
            *counts.entry(date.year()).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by_key(|(year, count)| (*count, *year))
            .map(|(year, _)| year)
    }
}

pub fn collect_game_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(".matchqignore")
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        let is_game_file = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| GAME_EXTENSIONS.contains(&ext));
        if path.is_file() && is_game_file {
            files.push(path.to_path_buf());
        }
    }

    files
}

pub fn read_paths_from_stdin() -> Vec<PathBuf> {
    let stdin = io::stdin();
    stdin
        .lock()
        .lines()
        .map_while(Result::ok)
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::compile::team_filter;
    use std::fs;
    use tempfile::TempDir;

    fn write_game(dir: &Path, name: &str, home: &str, away: &str, date: &str, score: (&str, &str)) {
        let body = format!(
            "---\nhome_team: {}\naway_team: {}\ndate: {}\nvenue: Somewhere\nhome_score: \"{}\"\naway_score: \"{}\"\n---\nGame: {} vs {}\n",
            home, away, date, score.0, score.1, home, away
        );
        fs::write(dir.join(name), body).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let games = dir.path().join("games");
        fs::create_dir(&games).unwrap();
        write_game(&games, "01.md", "Liverpool", "Arsenal", "2024-08-17", ("2", "1"));
        write_game(&games, "02.md", "Chelsea", "Liverpool", "2024-08-24", ("1", "1"));
        write_game(&games, "03.md", "Everton", "Fulham", "2023-05-01", ("0", "0"));
        fs::write(games.join("readme.md"), "no front matter here").unwrap();
        fs::write(dir.path().join(".matchqignore"), "skipped/\n").unwrap();
        fs::create_dir(dir.path().join("skipped")).unwrap();
        write_game(
            &dir.path().join("skipped"),
            "x.md",
            "Liverpool",
            "Wolves",
            "2024-09-01",
            ("5", "0"),
        );
        dir
    }

    fn request(filter: Option<crate::filter::FilterExpr>, k: usize) -> SearchRequest {
        SearchRequest {
            collection: "local".into(),
            query: "liverpool".into(),
            k,
            filter,
            include_metadata: true,
        }
    }

    #[tokio::test]
    async fn test_filtered_search_in_path_order() {
        let dir = fixture();
        let collection = LocalCollection::load(dir.path()).unwrap();
        assert_eq!(collection.len(), 3);

        let response = collection
            .search(&request(team_filter(&["liverpool"]), 10))
            .await
            .unwrap();
        let paths: Vec<&str> = response.results.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, ["games/01.md", "games/02.md"]);
    }

    #[tokio::test]
    async fn test_unfiltered_search_respects_k() {
        let dir = fixture();
        let collection = LocalCollection::load(dir.path()).unwrap();
        let response = collection.search(&request(None, 2)).await.unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn test_season_year_is_most_common() {
        let dir = fixture();
        let collection = LocalCollection::load(dir.path()).unwrap();
        assert_eq!(collection.season_year(), Some(2024));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            LocalCollection::load(dir.path()),
            Err(BackendError::EmptyCollection(_))
        ));
    }
}
