//! JSON form of [`FilterExpr`] as the search backend accepts it:
//! `{"$and": [...]}`, `{"$or": [...]}` and `{"field": {"$op": value}}`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::ast::{Condition, Field, FilterExpr, FilterValue, Operator};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at {path}")]
pub struct FilterError {
    pub message: String,
    pub path: String,
}

pub fn to_json(expr: &FilterExpr) -> Value {
    match expr {
        FilterExpr::Leaf(Condition { field, op, value }) => {
            let value = match value {
                FilterValue::One(v) => Value::String(v.clone()),
                FilterValue::Many(vs) => {
                    Value::Array(vs.iter().cloned().map(Value::String).collect())
                }
            };
            let mut inner = Map::new();
            inner.insert(op.key().to_string(), value);
            let mut outer = Map::new();
            outer.insert(field.as_str().to_string(), Value::Object(inner));
            Value::Object(outer)
        }
        FilterExpr::And(children) => logical("$and", children),
        FilterExpr::Or(children) => logical("$or", children),
    }
}

fn logical(key: &str, children: &[FilterExpr]) -> Value {
    let mut map = Map::new();
    map.insert(
        key.to_string(),
        Value::Array(children.iter().map(to_json).collect()),
    );
    Value::Object(map)
}

impl Serialize for FilterExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

/// Decodes a raw filter object. `null` and `{}` mean "no filter".
///
/// A bare scalar (`{"venue": "Anfield"}`) is read as `$eq`. Leaves with more
/// than one operator, objects naming more than one field, empty `$and`/`$or`
/// and list/scalar mismatches are rejected.
pub fn parse(value: &Value) -> Result<Option<FilterExpr>, FilterError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        _ => Decoder::new().expr(value).map(Some),
    }
}

pub fn parse_str(input: &str) -> Result<Option<FilterExpr>, FilterError> {
    let value: Value = serde_json::from_str(input).map_err(|e| FilterError {
        message: format!("invalid JSON: {}", e),
        path: "$".to_string(),
    })?;
    parse(&value)
}

struct Decoder {
    path: Vec<String>,
}

impl Decoder {
    fn new() -> Self {
        Self {
            path: vec!["$".to_string()],
        }
    }

    fn expr(&mut self, value: &Value) -> Result<FilterExpr, FilterError> {
        let (key, inner) = self.single_entry(value, "filter node")?;

        match key {
            "$and" | "$or" => {
                let children = self.children(key, inner)?;
                Ok(if key == "$and" {
                    FilterExpr::And(children)
                } else {
                    FilterExpr::Or(children)
                })
            }
            k if k.starts_with('$') => {
                Err(self.error(&format!("unknown logical operator '{}'", k)))
            }
            name => {
                let Some(field) = Field::parse(name) else {
                    return Err(self.error(&format!("unknown field '{}'", name)));
                };
                self.path.push(name.to_string());
                let leaf = self.condition(field, inner);
                self.path.pop();
                leaf
            }
        }
    }

    fn children(&mut self, key: &str, value: &Value) -> Result<Vec<FilterExpr>, FilterError> {
        let Some(items) = value.as_array() else {
            return Err(self.error(&format!("{} expects an array", key)));
        };
        if items.is_empty() {
            return Err(self.error(&format!("{} must not be empty", key)));
        }

        let mut children = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.path.push(format!("{}[{}]", key, i));
            let child = self.expr(item);
            self.path.pop();
            children.push(child?);
        }
        Ok(children)
    }

    fn condition(&mut self, field: Field, value: &Value) -> Result<FilterExpr, FilterError> {
        if !value.is_object() {
            let scalar = self.scalar(value)?;
            return Ok(FilterExpr::eq(field, scalar));
        }

        let (key, operand) = self.single_entry(value, "leaf (exactly one operator per field)")?;
        let Some(op) = Operator::from_key(key) else {
            return Err(self.error(&format!("unknown operator '{}'", key)));
        };

        let value = if op.takes_list() {
            let Some(items) = operand.as_array() else {
                return Err(self.error(&format!("{} expects a list", key)));
            };
            let values = items
                .iter()
                .map(|v| self.scalar(v))
                .collect::<Result<Vec<_>, _>>()?;
            FilterValue::Many(values)
        } else {
            FilterValue::One(self.scalar(operand)?)
        };

        Ok(FilterExpr::leaf(field, op, value))
    }

    fn single_entry<'v>(
        &self,
        value: &'v Value,
        what: &str,
    ) -> Result<(&'v str, &'v Value), FilterError> {
        let Some(map) = value.as_object() else {
            return Err(self.error(&format!("{} must be an object", what)));
        };
        let mut entries = map.iter();
        match (entries.next(), entries.next()) {
            (Some((k, v)), None) => Ok((k.as_str(), v)),
            (None, _) => Err(self.error(&format!("empty {}", what))),
            (Some(_), Some(_)) => Err(self.error(&format!(
                "{} has {} keys, expected one",
                what,
                map.len()
            ))),
        }
    }

    fn scalar(&self, value: &Value) -> Result<String, FilterError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.error("expected a string or number")),
        }
    }

    fn error(&self, message: &str) -> FilterError {
        FilterError {
            message: message.to_string(),
            path: self.path.join("."),
        }
    }
}
