//! Table grids: plain, pivoted by category, and distinct listings

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use vq_data::dataset::{field, field_text, value_text, Row};

use crate::format::format_measure;

/// Rendered table content
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableGrid {
    pub headers: Vec<String>,

    /// Category columns under the measure header, pivoted tables only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_headers: Vec<String>,

    pub rows: Vec<Vec<String>>,
}

/// Header label of a field: lower-cased, first letter upper-cased
pub fn header_label(field_name: &str) -> String {
    let lower = field_name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Text of a measure cell
///
/// Numbers and numeric strings go through the shared formatter, other text
/// passes through and missing values stay blank.
pub fn format_cell(value: Option<&Value>, data_format: &str) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|v| format_measure(data_format, v))
            .unwrap_or_else(|| n.to_string()),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && !s.trim().is_empty() => format_measure(data_format, v),
            _ => s.clone(),
        },
        Some(other) => value_text(other),
    }
}

/// `dimension | measure`
pub fn simple_grid(rows: &[Row], dimension: &str, measure: &str, data_format: &str) -> TableGrid {
    TableGrid {
        headers: vec![header_label(dimension), header_label(measure)],
        sub_headers: Vec::new(),
        rows: rows
            .iter()
            .map(|row| {
                vec![
                    field_text(row, dimension),
                    format_cell(field(row, measure), data_format),
                ]
            })
            .collect(),
    }
}

/// One row per dimension value, one column per category value
///
/// Dimension values keep the order they were first seen in; category columns
/// are sorted. A pair missing from the rows leaves its cell blank, a pair
/// seen twice keeps the later measure.
pub fn category_grid(
    rows: &[Row],
    category: &str,
    dimension: &str,
    measure: &str,
    data_format: &str,
) -> TableGrid {
    let mut by_dimension: IndexMap<String, IndexMap<String, Option<&Value>>> = IndexMap::new();
    let mut groups = BTreeSet::new();

    for row in rows {
        let group = field_text(row, category);
        by_dimension
            .entry(field_text(row, dimension))
            .or_default()
            .insert(group.clone(), field(row, measure));
        groups.insert(group);
    }

    let groups: Vec<String> = groups.into_iter().collect();
    let grid_rows = by_dimension
        .into_iter()
        .map(|(dimension_value, cells)| {
            let mut line = Vec::with_capacity(groups.len() + 1);
            line.push(dimension_value);
            line.extend(groups.iter().map(|group| {
                cells
                    .get(group)
                    .map(|value| format_cell(*value, data_format))
                    .unwrap_or_default()
            }));
            line
        })
        .collect();

    TableGrid {
        headers: vec![header_label(dimension), header_label(measure)],
        sub_headers: groups,
        rows: grid_rows,
    }
}

/// Single column of distinct dimension values
pub fn qualitative_grid(rows: &[Row], dimension: &str) -> TableGrid {
    TableGrid {
        headers: vec![header_label(dimension)],
        sub_headers: Vec::new(),
        rows: rows.iter().map(|row| vec![field_text(row, dimension)]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_pivot_fills_missing_pairs_blank() {
        let data = rows(json!([
            {"cat": "A", "dim": "x", "m": 1},
            {"cat": "B", "dim": "x", "m": 2},
            {"cat": "A", "dim": "y", "m": 3}
        ]));
        let grid = category_grid(&data, "cat", "dim", "m", "");

        assert_eq!(grid.headers, ["Dim", "M"]);
        assert_eq!(grid.sub_headers, ["A", "B"]);
        assert_eq!(grid.rows, vec![vec!["x", "1", "2"], vec!["y", "3", ""]]);
    }

    #[test]
    fn test_pivot_sorts_groups_keeps_dimension_order() {
        let data = rows(json!([
            {"gender": "Male", "region": "South", "total": "10"},
            {"gender": "Female", "region": "North", "total": "12"},
            {"gender": "Female", "region": "South", "total": "7"}
        ]));
        let grid = category_grid(&data, "Gender", "Region", "Total", "");

        assert_eq!(grid.headers, ["Region", "Total"]);
        assert_eq!(grid.sub_headers, ["Female", "Male"]);
        assert_eq!(
            grid.rows,
            vec![vec!["South", "7", "10"], vec!["North", "12", ""]]
        );
    }

    #[test]
    fn test_simple_grid_formats_measures() {
        let data = rows(json!([
            {"region": "North", "total": "2512.3456"},
            {"region": "South", "total": null},
            {"region": "East", "total": "n/a"}
        ]));
        let grid = simple_grid(&data, "REGION", "total", "$");

        assert_eq!(grid.headers, ["Region", "Total"]);
        assert_eq!(
            grid.rows,
            vec![
                vec!["North", "$2,512.35"],
                vec!["South", ""],
                vec!["East", "n/a"]
            ]
        );
    }

    #[test]
    fn test_qualitative_grid() {
        let data = rows(json!([{"district": "Kisumu"}, {"district": "Mombasa"}]));
        let grid = qualitative_grid(&data, "district");
        assert_eq!(grid.headers, ["District"]);
        assert_eq!(grid.rows, vec![vec!["Kisumu"], vec!["Mombasa"]]);
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(Some(&json!(2500)), "s"), "2.5k");
        assert_eq!(format_cell(Some(&json!(" ")), ""), " ");
        assert_eq!(format_cell(None, "$"), "");
    }
}
