//! Row ordering for charts

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vq_data::dataset::{coerce_number, field, value_text, Row};
use vq_data::NullConfig;

/// `data_sort` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
    /// By dimension
    #[default]
    Dimension,
}

impl SortOrder {
    /// Parse the option; anything but `asc`/`desc` sorts by dimension
    pub fn from_option(value: &str) -> Self {
        match value.trim() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::Dimension,
        }
    }
}

/// Sort rows in place
///
/// `asc`/`desc` order by measure and keep ties in row order; rows without a
/// numeric measure go last. The default orders by dimension: numerically
/// between numeric values, by text otherwise, numbers before text.
pub fn sort_rows(rows: &mut [Row], order: SortOrder, dimension: &str, measure: &str, nulls: &NullConfig) {
    match order {
        SortOrder::Asc | SortOrder::Desc => {
            let descending = order == SortOrder::Desc;
            rows.sort_by(|a, b| {
                let a = field(a, measure).and_then(|v| coerce_number(v, nulls));
                let b = field(b, measure).and_then(|v| coerce_number(v, nulls));
                match (a, b) {
                    (Some(a), Some(b)) if descending => b.total_cmp(&a),
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
        SortOrder::Dimension => {
            rows.sort_by(|a, b| {
                compare_dimension(field(a, dimension), field(b, dimension))
            });
        }
    }
}

fn dimension_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Three-way comparison of two dimension values
pub fn compare_dimension(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (dimension_number(a), dimension_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let a = a.map(value_text).unwrap_or_default();
            let b = b.map(value_text).unwrap_or_default();
            a.cmp(&b)
        }
    }
}

/// `parseInt(value, 10)`: leading integer of the text, if any
pub fn parse_int(value: &Value) -> Option<i64> {
    let text = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => return Some(i),
            None => n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc().to_string())?,
        },
        Value::String(s) => s.clone(),
        _ => return None,
    };

    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Order tornado values: larger magnitude first, the positive side first on
/// equal magnitude, values that are not integers last
pub fn tornado_order<T>(items: &mut [T], value: impl Fn(&T) -> Option<i64>) {
    items.sort_by(|a, b| match (value(a), value(b)) {
        (Some(a), Some(b)) => b
            .unsigned_abs()
            .cmp(&a.unsigned_abs())
            .then_with(|| b.cmp(&a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn column(rows: &[Row], name: &str) -> Vec<String> {
        rows.iter().map(|r| value_text(&r[name])).collect()
    }

    #[test]
    fn test_asc_is_stable() {
        let mut data = rows(json!([
            {"x": "A", "y": "3"},
            {"x": "B", "y": "1"},
            {"x": "C", "y": "3"}
        ]));
        sort_rows(&mut data, SortOrder::Asc, "x", "y", &NullConfig::default());
        assert_eq!(column(&data, "x"), ["B", "A", "C"]);
    }

    #[test]
    fn test_desc_keeps_ties_in_row_order() {
        let mut data = rows(json!([
            {"x": "A", "y": 3},
            {"x": "B", "y": 1},
            {"x": "C", "y": 3},
            {"x": "D", "y": "n/a"}
        ]));
        sort_rows(&mut data, SortOrder::Desc, "x", "y", &NullConfig::default());
        assert_eq!(column(&data, "x"), ["A", "C", "B", "D"]);
    }

    #[test]
    fn test_dimension_sort() {
        let mut data = rows(json!([
            {"x": "10", "y": 1},
            {"x": "9", "y": 1},
            {"x": "Unknown", "y": 1},
            {"x": "Apple", "y": 1},
            {"x": 2, "y": 1}
        ]));
        sort_rows(&mut data, SortOrder::Dimension, "x", "y", &NullConfig::default());
        assert_eq!(column(&data, "x"), ["2", "9", "10", "Apple", "Unknown"]);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&json!("12.7")), Some(12));
        assert_eq!(parse_int(&json!(" -40 people")), Some(-40));
        assert_eq!(parse_int(&json!(-3.9)), Some(-3));
        assert_eq!(parse_int(&json!(7)), Some(7));
        assert_eq!(parse_int(&json!("abc")), None);
        assert_eq!(parse_int(&json!(null)), None);
    }

    #[test]
    fn test_tornado_order() {
        let mut values = vec![Some(3), Some(-5), None, Some(5), Some(-1)];
        tornado_order(&mut values, |v| *v);
        assert_eq!(values, [Some(5), Some(-5), Some(3), Some(-1), None]);
    }

    #[test]
    fn test_sort_order_option() {
        assert_eq!(SortOrder::from_option("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::from_option("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::from_option(""), SortOrder::Dimension);
    }
}
