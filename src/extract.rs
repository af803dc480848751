//! Catalog-driven entity extraction from free-text queries.
//!
//! Each category has an ordered catalog of entries; each entry has an ordered
//! list of surface forms. Entries are tried in catalog order and a match
//! claims its span of the query, so when two entries overlap the one listed
//! first wins. Within an entry the first listed alias wins a tie at the same
//! position.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Team,
    Venue,
    Date,
    Score,
    Status,
    League,
}

impl Category {
    /// Compilation order.
    pub const ALL: [Category; 6] = [
        Category::Team,
        Category::Venue,
        Category::Date,
        Category::Score,
        Category::Status,
        Category::League,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Team => "team",
            Category::Venue => "venue",
            Category::Date => "date",
            Category::Score => "score",
            Category::Status => "status",
            Category::League => "league",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matched values per category. Categories with no match are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedEntities {
    entries: BTreeMap<Category, Vec<String>>,
}

impl ExtractedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, value: impl Into<String>) {
        let value = value.into();
        let values = self.entries.entry(category).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn get(&self, category: Category) -> &[String] {
        self.entries.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, category: Category) -> bool {
        !self.get(category).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[derive(Error, Debug)]
#[error("invalid {category} pattern '{pattern}': {source}")]
pub struct CatalogError {
    category: Category,
    pattern: String,
    #[source]
    source: regex::Error,
}

/// What an entry contributes when it matches.
#[derive(Debug, Clone, Copy)]
enum Emit {
    /// The entry's canonical value.
    Value(&'static str),
    /// The matched text, whitespace-normalized.
    Matched,
    /// Capture groups 1 and 2 joined with '-'.
    Scoreline,
    /// Capture group 1.
    Group,
}

struct EntrySpec {
    emit: Emit,
    pattern: Source,
}

enum Source {
    Aliases(&'static [&'static str]),
    Regex(&'static str),
}

const fn aliases(value: &'static str, forms: &'static [&'static str]) -> EntrySpec {
    EntrySpec {
        emit: Emit::Value(value),
        pattern: Source::Aliases(forms),
    }
}

const fn regex(emit: Emit, pattern: &'static str) -> EntrySpec {
    EntrySpec {
        emit,
        pattern: Source::Regex(pattern),
    }
}

const TEAMS: &[EntrySpec] = &[
    aliases("Manchester United", &["manchester united", "man utd", "united"]),
    aliases("Liverpool", &["liverpool", "reds"]),
    aliases("Arsenal", &["arsenal", "gunners"]),
    aliases("Chelsea", &["chelsea", "blues"]),
    aliases("Manchester City", &["manchester city", "man city", "city"]),
    aliases("Tottenham", &["tottenham", "spurs"]),
    aliases("Newcastle", &["newcastle", "magpies"]),
    aliases("Aston Villa", &["aston villa", "villa"]),
    aliases("West Ham", &["west ham", "hammers"]),
    aliases("Brighton", &["brighton", "seagulls"]),
    aliases("Crystal Palace", &["crystal palace", "palace"]),
    aliases("Brentford", &["brentford", "bees"]),
    aliases("Fulham", &["fulham", "cottagers"]),
    aliases("Wolves", &["wolves"]),
    aliases("Nottingham Forest", &["nottingham forest", "forest"]),
    aliases("Burnley", &["burnley", "clarets"]),
    aliases("Sheffield United", &["sheffield united", "blades"]),
    aliases("Everton", &["everton", "toffees"]),
    aliases("Luton Town", &["luton town", "luton"]),
    aliases("Bournemouth", &["bournemouth", "cherries"]),
];

const VENUES: &[EntrySpec] = &[
    aliases("Old Trafford", &["old trafford"]),
    aliases("Anfield", &["anfield"]),
    aliases("Emirates Stadium", &["emirates stadium", "emirates"]),
    aliases("Stamford Bridge", &["stamford bridge"]),
    aliases("Etihad Stadium", &["etihad stadium", "etihad"]),
    aliases("Tottenham Hotspur Stadium", &["tottenham hotspur stadium"]),
    aliases("St James Park", &["st james park", "st james' park", "st. james park"]),
    aliases("Villa Park", &["villa park"]),
    aliases("London Stadium", &["london stadium"]),
    aliases("Amex Stadium", &["amex stadium", "amex"]),
    aliases("Selhurst Park", &["selhurst park"]),
    aliases("Gtech Community Stadium", &["gtech community stadium", "gtech"]),
    aliases("Craven Cottage", &["craven cottage"]),
    aliases("Molineux Stadium", &["molineux stadium", "molineux"]),
    aliases("City Ground", &["city ground"]),
    aliases("Turf Moor", &["turf moor"]),
    aliases("Bramall Lane", &["bramall lane"]),
    aliases("Goodison Park", &["goodison park"]),
    aliases("Kenilworth Road", &["kenilworth road"]),
    aliases("Vitality Stadium", &["vitality stadium"]),
];

const DATES: &[EntrySpec] = &[
    regex(
        Emit::Matched,
        r"\b\d{1,2}(?:st|nd|rd|th)?\s+(?:of\s+)?(?:january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|august|aug|september|sept|sep|october|oct|november|nov|december|dec)\b",
    ),
    regex(Emit::Matched, r"\b\d{4}-\d{2}-\d{2}\b"),
    aliases("today", &["today", "tonight"]),
    aliases("yesterday", &["yesterday"]),
    aliases("tomorrow", &["tomorrow"]),
    aliases("this weekend", &["this weekend"]),
    aliases("last weekend", &["last weekend"]),
    aliases("next weekend", &["next weekend"]),
    aliases("this week", &["this week"]),
    aliases("last week", &["last week", "past week"]),
    aliases("next week", &["next week"]),
    aliases("this month", &["this month"]),
    aliases("last month", &["last month", "past month"]),
    aliases("next month", &["next month"]),
    regex(
        Emit::Matched,
        r"\b(?:january|february|feb|march|april|apr|june|jun|july|jul|august|aug|september|sept|sep|october|oct|november|nov|december)\b",
    ),
    // These double as ordinary words, so they need a preposition in front.
    regex(
        Emit::Group,
        r"\b(?:in|during|of|from|since|until|before|after|through)\s+(may|mar|jan|dec)\b",
    ),
];

const SCORES: &[EntrySpec] = &[
    aliases(
        "high_scoring",
        &["high scoring", "high-scoring", "high score", "lots of goals", "many goals"],
    ),
    aliases(
        "low_scoring",
        &["low scoring", "low-scoring", "low score", "few goals"],
    ),
    aliases("goalless", &["goalless", "no goals", "0-0", "nil-nil"]),
    aliases("draw", &["draws", "draw", "drawn", "ties", "tie", "tied"]),
    aliases(
        "result",
        &[
            "wins", "win", "won", "victory", "victories", "defeats", "defeat", "losses", "loss",
            "lost",
        ],
    ),
    regex(Emit::Scoreline, r"(?:^|\s)(\d{1,2})-(\d{1,2})(?:$|[\s,.!?])"),
];

const STATUSES: &[EntrySpec] = &[
    aliases("Completed", &["completed", "finished", "played"]),
    aliases("Scheduled", &["scheduled", "upcoming", "future"]),
    aliases("Cancelled", &["cancelled", "canceled"]),
    aliases("Postponed", &["postponed"]),
];

const LEAGUES: &[EntrySpec] = &[
    aliases(
        "Premier League",
        &["english premier league", "premier league", "epl"],
    ),
    aliases("Championship", &["championship"]),
    aliases("FA Cup", &["fa cup"]),
    aliases("Carabao Cup", &["carabao cup", "league cup", "efl cup"]),
];

/// Month number for a full or abbreviated English month name.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().to_lowercase();
    let month = match name.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

struct Entry {
    emit: Emit,
    pattern: Regex,
}

/// Immutable, compiled catalog. Build once and share across requests.
pub struct PatternExtractor {
    catalogs: Vec<(Category, Vec<Entry>)>,
}

impl PatternExtractor {
    pub fn new() -> Result<Self, CatalogError> {
        let specs: [(Category, &[EntrySpec]); 6] = [
            (Category::Team, TEAMS),
            (Category::Venue, VENUES),
            (Category::Date, DATES),
            (Category::Score, SCORES),
            (Category::Status, STATUSES),
            (Category::League, LEAGUES),
        ];

        let mut catalogs = Vec::with_capacity(specs.len());
        for (category, entries) in specs {
            let compiled = entries
                .iter()
                .map(|spec| compile(category, spec))
                .collect::<Result<Vec<_>, _>>()?;
            catalogs.push((category, compiled));
        }
        Ok(Self { catalogs })
    }

    /// Extracts every category independently. A query that mentions nothing
    /// in the catalog yields empty entities.
    pub fn extract(&self, query: &str) -> ExtractedEntities {
        let text = query.to_lowercase();
        let mut entities = ExtractedEntities::new();

        for (category, entries) in &self.catalogs {
            let mut claimed: Vec<Range<usize>> = Vec::new();
            for entry in entries {
                for caps in entry.pattern.captures_iter(&text) {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    let span = whole.range();
                    if claimed.iter().any(|c| overlaps(c, &span)) {
                        continue;
                    }
                    let value = match entry.emit {
                        Emit::Value(v) => v.to_string(),
                        Emit::Matched => normalize_space(whole.as_str()),
                        Emit::Scoreline => match (caps.get(1), caps.get(2)) {
                            (Some(h), Some(a)) => format!("{}-{}", h.as_str(), a.as_str()),
                            _ => continue,
                        },
                        Emit::Group => match caps.get(1) {
                            Some(group) => group.as_str().to_string(),
                            None => continue,
                        },
                    };
                    claimed.push(span);
                    entities.push(*category, value);
                    if matches!(entry.emit, Emit::Value(_)) {
                        break;
                    }
                }
            }
        }

        tracing::debug!(query, ?entities, "extracted entities");
        entities
    }
}

fn compile(category: Category, spec: &EntrySpec) -> Result<Entry, CatalogError> {
    let source = match spec.pattern {
        Source::Aliases(forms) => {
            let alternation: Vec<String> = forms.iter().map(|f| regex::escape(f)).collect();
            format!(r"\b(?:{})\b", alternation.join("|"))
        }
        Source::Regex(pattern) => pattern.to_string(),
    };
    let pattern = Regex::new(&source).map_err(|source_err| CatalogError {
        category,
        pattern: source.clone(),
        source: source_err,
    })?;
    Ok(Entry {
        emit: spec.emit,
        pattern,
    })
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
