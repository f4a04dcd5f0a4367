//! Dashboard definitions - the views and saved filters of one resource

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use vq_core::{Connector, FilterChain, ViewSyncSettings};
use vq_views::{ChartOptions, ChartView, MapOptions, MapView, TableOptions, TableView, VizView};

/// Kind of a dashboard view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Chart,
    Table,
    Map,
}

/// One view as written in a dashboard file
#[derive(Debug, Clone, Deserialize)]
pub struct ViewDefinition {
    pub kind: ViewKind,

    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default = "default_sync_filters")]
    pub sync_filters: bool,

    #[serde(default)]
    pub options: Value,
}

fn default_sync_filters() -> bool {
    true
}

/// Dashboard file
#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    pub resource_id: String,

    /// Saved filters, as a list or a JSON string holding one
    #[serde(default)]
    pub filters: Value,

    #[serde(default)]
    pub views: Vec<ViewDefinition>,
}

impl Dashboard {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dashboard {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("Invalid dashboard {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let dashboard: Dashboard = serde_json::from_str(raw)?;
        if dashboard.resource_id.trim().is_empty() {
            bail!("Dashboard has no resource_id");
        }
        Ok(dashboard)
    }

    /// Saved filters followed by the extra `--filter` clauses
    pub fn filter_chain(&self, extra: &[String]) -> Result<FilterChain> {
        let mut chain = FilterChain::from_options_value(&self.filters)?;
        for raw in extra {
            let (field, value, connector) = parse_filter_arg(raw)?;
            chain.push(field, value, connector);
        }
        Ok(chain)
    }
}

impl ViewDefinition {
    /// Build the view and its sync settings
    pub fn build(&self) -> Result<(Arc<dyn VizView>, ViewSyncSettings)> {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let options = match &self.options {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        let view: Arc<dyn VizView> = match self.kind {
            ViewKind::Chart => {
                let options: ChartOptions =
                    serde_json::from_value(options).context("Invalid chart options")?;
                Arc::new(ChartView::new(id, options))
            }
            ViewKind::Table => {
                let options: TableOptions =
                    serde_json::from_value(options).context("Invalid table options")?;
                Arc::new(TableView::new(id, options))
            }
            ViewKind::Map => {
                let options: MapOptions =
                    serde_json::from_value(options).context("Invalid map options")?;
                Arc::new(MapView::new(id, options))
            }
        };

        Ok((
            view,
            ViewSyncSettings {
                sync_filters: self.sync_filters,
            },
        ))
    }
}

/// Parse `field=value`, optionally prefixed with a connector: `or:field=value`
pub fn parse_filter_arg(raw: &str) -> Result<(String, String, Connector)> {
    let (connector, clause) = match raw.split_once(':') {
        Some((prefix, rest)) if prefix.parse::<Connector>().is_ok() => (prefix.parse()?, rest),
        _ => (Connector::And, raw),
    };

    match clause.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string(), connector))
        }
        _ => bail!("Expected a filter like field=value, got '{}'", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_arg() {
        assert_eq!(
            parse_filter_arg("region=North").unwrap(),
            ("region".to_string(), "North".to_string(), Connector::And)
        );
        assert_eq!(
            parse_filter_arg("or:time=10:30").unwrap(),
            ("time".to_string(), "10:30".to_string(), Connector::Or)
        );
        assert_eq!(
            parse_filter_arg("ratio=1:2").unwrap(),
            ("ratio".to_string(), "1:2".to_string(), Connector::And)
        );
        assert!(parse_filter_arg("=x").is_err());
        assert!(parse_filter_arg("region").is_err());
    }

    #[test]
    fn test_dashboard_filters_and_views() {
        let dashboard = Dashboard::from_json_str(
            r#"{
                "resource_id": "res-1",
                "filters": "[{\"order\": 1, \"name\": \"country\", \"value\": \"Kenya\"}]",
                "views": [
                    {"kind": "chart", "options": {"chart_type": "bar", "x_axis": "region", "y_axis": "total"}},
                    {"kind": "table", "sync_filters": false},
                    {"kind": "map", "options": {"map_resource": "http://geo/counties.json"}}
                ]
            }"#,
        )
        .unwrap();

        let chain = dashboard
            .filter_chain(&["or:country=Uganda".to_string()])
            .unwrap();
        assert_eq!(
            chain.build_where(),
            "WHERE (\"country\" = 'Kenya') OR (\"country\" = 'Uganda')"
        );

        let built: Vec<_> = dashboard
            .views
            .iter()
            .map(|definition| definition.build().unwrap())
            .collect();
        assert_eq!(built[0].0.view_type(), "ChartView");
        assert_eq!(built[1].0.view_type(), "TableView");
        assert!(!built[1].1.sync_filters);
        assert_eq!(built[2].0.view_type(), "MapView");
    }

    #[test]
    fn test_dashboard_requires_resource() {
        assert!(Dashboard::from_json_str(r#"{"resource_id": " "}"#).is_err());
        assert!(Dashboard::from_json_str(r#"{"resource_id": "r", "views": [{"kind": "pie"}]}"#).is_err());
    }
}
