//! Evaluation of search requests against stored items.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub sort_expressions: Vec<SortExpression>,
    #[serde(default)]
    pub status_code: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SortExpression {
    pub field: String,
    #[serde(default)]
    pub ascending: bool,
}

impl ListQuery {
    /// Items matching the query, sorted, before paging.
    pub fn matching<'a>(&self, items: &'a [Value], status_code_of: impl Fn(&Value) -> Option<String>) -> Vec<&'a Value> {
        let empty = serde_json::Map::new();
        let fields = self
            .filter
            .as_ref()
            .and_then(|f| f.get("tf"))
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let mut matched: Vec<&Value> = items
            .iter()
            .filter(|item| !self.active || is_active(item))
            .filter(|item| self.ids.is_empty() || self.ids.iter().any(|id| item["__id"] == *id))
            .filter(|item| {
                self.status_code.is_empty()
                    || status_code_of(*item).is_some_and(|code| self.status_code.contains(&code))
            })
            .filter(|item| fields.iter().all(|(key, filter)| field_matches(&item[key.as_str()], filter)))
            .collect();

        for expr in self.sort_expressions.iter().rev() {
            matched.sort_by(|a, b| {
                let ord = compare(&a[expr.field.as_str()], &b[expr.field.as_str()]);
                if expr.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        matched
    }
}

fn is_active(item: &Value) -> bool {
    item.get("__deletedAt").map_or(true, Value::is_null)
}

fn field_matches(value: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(range) if range.contains_key("min") || range.contains_key("max") => {
            let above = range.get("min").map_or(true, |min| compare(value, min) != Ordering::Less);
            let below = range.get("max").map_or(true, |max| compare(value, max) != Ordering::Greater);
            !value.is_null() && above && below
        }
        Value::Array(refs) => match value {
            Value::Array(held) => refs.iter().all(|r| held.contains(r)),
            other => refs.contains(other),
        },
        scalar => value == scalar,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn items() -> Vec<Value> {
        vec![
            json!({"__id": "a", "__name": "Meat", "price": 120, "__status": {"status": 1}}),
            json!({"__id": "b", "__name": "Milk", "price": 40, "__status": {"status": 2}}),
            json!({"__id": "c", "__name": "Bread", "price": 60, "__deletedAt": "2024-01-01T00:00:00Z"}),
        ]
    }

    fn query(raw: Value) -> ListQuery {
        serde_json::from_value(raw).unwrap()
    }

    fn ids(matched: Vec<&Value>) -> Vec<&str> {
        matched.iter().map(|v| v["__id"].as_str().unwrap()).collect()
    }

    fn no_status(_: &Value) -> Option<String> {
        None
    }

    #[test]
    fn active_hides_deleted_items() {
        let items = items();
        let q = query(json!({"from": 0, "size": 10, "active": true, "filter": {"tf": {}}}));
        assert_eq!(ids(q.matching(&items, no_status)), vec!["a", "b"]);
        let q = query(json!({"from": 0, "size": 10, "active": false, "filter": {"tf": {}}}));
        assert_eq!(q.matching(&items, no_status).len(), 3);
    }

    #[test]
    fn number_range_and_scalar_filters() {
        let items = items();
        let q = query(json!({"active": false, "filter": {"tf": {"price": {"min": 50, "max": 500}}}}));
        assert_eq!(ids(q.matching(&items, no_status)), vec!["a", "c"]);
        let q = query(json!({"active": false, "filter": {"tf": {"__name": "Milk"}}}));
        assert_eq!(ids(q.matching(&items, no_status)), vec!["b"]);
    }

    #[test]
    fn sorts_and_filters_by_status() {
        let items = items();
        let q = query(json!({"active": false, "sortExpressions": [{"field": "price", "ascending": true}]}));
        assert_eq!(ids(q.matching(&items, no_status)), vec!["b", "c", "a"]);

        let q = query(json!({"active": true, "statusCode": ["st2"]}));
        let code = |item: &Value| match item["__status"]["status"].as_i64() {
            Some(2) => Some("st2".to_string()),
            _ => None,
        };
        assert_eq!(ids(q.matching(&items, code)), vec!["b"]);
    }
}
