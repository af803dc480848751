use super::ast::{Condition, FilterExpr, FilterValue, Operator};
use crate::record::GameRecord;

/// Applies a filter to one record with the backend's semantics: exact,
/// case-sensitive string comparison, and a missing field never matches.
pub fn evaluate(expr: &FilterExpr, record: &GameRecord) -> bool {
    match expr {
        FilterExpr::Leaf(condition) => eval_condition(record, condition),
        FilterExpr::And(children) => children.iter().all(|c| evaluate(c, record)),
        FilterExpr::Or(children) => children.iter().any(|c| evaluate(c, record)),
    }
}

fn eval_condition(record: &GameRecord, condition: &Condition) -> bool {
    try_eval_condition(record, condition).unwrap_or(false)
}

fn try_eval_condition(record: &GameRecord, condition: &Condition) -> Option<bool> {
    let stored = record.field(condition.field)?;

    match (&condition.value, condition.op) {
        (FilterValue::Many(values), Operator::In) => Some(values.iter().any(|v| v == stored)),
        (FilterValue::Many(values), Operator::Nin) => Some(!values.iter().any(|v| v == stored)),
        (FilterValue::One(value), op) => compare_ord(stored, value.as_str(), op),
        (FilterValue::Many(_), _) => None,
    }
}

/// Lexicographic, like the backend: "10" sorts before "3".
fn compare_ord<T: Ord + ?Sized>(a: &T, b: &T, op: Operator) -> Option<bool> {
    Some(match op {
        Operator::Eq => a == b,
        Operator::Ne => a != b,
        Operator::Gt => a > b,
        Operator::Lt => a < b,
        Operator::Gte => a >= b,
        Operator::Lte => a <= b,
        Operator::In | Operator::Nin => return None,
    })
}
