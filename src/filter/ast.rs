use serde::Serialize;
use std::fmt;

/// Metadata fields the search backend indexes for every game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    HomeTeam,
    AwayTeam,
    Venue,
    Date,
    League,
    Status,
    HomeScore,
    AwayScore,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::HomeTeam,
        Field::AwayTeam,
        Field::Venue,
        Field::Date,
        Field::League,
        Field::Status,
        Field::HomeScore,
        Field::AwayScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::HomeTeam => "home_team",
            Field::AwayTeam => "away_team",
            Field::Venue => "venue",
            Field::Date => "date",
            Field::League => "league",
            Field::Status => "status",
            Field::HomeScore => "home_score",
            Field::AwayScore => "away_score",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Nin,
    ];

    /// Wire key, e.g. `$gte`.
    pub fn key(self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Nin => "$nin",
        }
    }

    pub fn from_key(key: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.key() == key)
    }

    /// `in` and `nin` take a list; every other operator takes one value.
    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::Nin)
    }

    fn phrase(self) -> &'static str {
        match self {
            Operator::Eq => "equals",
            Operator::Ne => "does not equal",
            Operator::Gt => "is greater than",
            Operator::Gte => "is greater than or equal to",
            Operator::Lt => "is less than",
            Operator::Lte => "is less than or equal to",
            Operator::In => "is one of",
            Operator::Nin => "is not one of",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::One(v) => write!(f, "'{}'", v),
            FilterValue::Many(vs) => {
                let quoted: Vec<String> = vs.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// One field, one operator, one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: Field,
    pub op: Operator,
    pub value: FilterValue,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.phrase(), self.value)
    }
}

/// Boolean filter tree sent to the search backend.
///
/// "No filter" is `Option::None` at the call site; `And`/`Or` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Leaf(Condition),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::Eq, FilterValue::One(value.into()))
    }

    pub fn cmp(field: Field, op: Operator, value: impl Into<String>) -> Self {
        Self::leaf(field, op, FilterValue::One(value.into()))
    }

    pub fn one_of(field: Field, values: Vec<String>) -> Self {
        Self::leaf(field, Operator::In, FilterValue::Many(values))
    }

    pub fn leaf(field: Field, op: Operator, value: FilterValue) -> Self {
        FilterExpr::Leaf(Condition { field, op, value })
    }

    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            FilterExpr::Leaf(c) => out.push(c),
            FilterExpr::And(children) | FilterExpr::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Human-readable explanation, one clause per top-level child.
    pub fn describe(&self) -> String {
        match self {
            FilterExpr::And(children) => children
                .iter()
                .map(FilterExpr::describe_clause)
                .collect::<Vec<_>>()
                .join("; "),
            other => other.describe_clause(),
        }
    }

    fn describe_clause(&self) -> String {
        match self {
            FilterExpr::Leaf(c) => c.to_string(),
            FilterExpr::And(children) => join_children(children, " and "),
            FilterExpr::Or(children) => join_children(children, " or "),
        }
    }
}

fn join_children(children: &[FilterExpr], sep: &str) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|c| match c {
            FilterExpr::Leaf(_) => c.describe_clause(),
            _ => format!("({})", c.describe_clause()),
        })
        .collect();
    parts.join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_keys_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_key(op.key()), Some(op));
        }
        assert_eq!(Operator::from_key("$regex"), None);
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(Field::parse("home_score"), Some(Field::HomeScore));
        assert_eq!(Field::parse("team"), None);
    }

    #[test]
    fn test_describe() {
        let expr = FilterExpr::And(vec![
            FilterExpr::Or(vec![
                FilterExpr::eq(Field::HomeTeam, "Liverpool"),
                FilterExpr::eq(Field::AwayTeam, "Liverpool"),
            ]),
            FilterExpr::one_of(Field::Venue, vec!["Anfield".into(), "anfield".into()]),
        ]);
        assert_eq!(
            expr.describe(),
            "home_team equals 'Liverpool' or away_team equals 'Liverpool'; \
             venue is one of ['Anfield', 'anfield']"
        );
    }

    #[test]
    fn test_leaves_flatten_groups() {
        let expr = FilterExpr::And(vec![
            FilterExpr::cmp(Field::Date, Operator::Gte, "2024-09-01"),
            FilterExpr::eq(Field::Status, "Completed"),
        ]);
        let fields: Vec<Field> = expr.leaves().iter().map(|c| c.field).collect();
        assert_eq!(fields, [Field::Date, Field::Status]);
    }
}
