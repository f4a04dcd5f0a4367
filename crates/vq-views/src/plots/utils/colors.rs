//! Color utilities for plots

use colorous::Color;

/// `#rrggbb` form of a color
pub fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Default categorical series colors
pub fn categorical_palette() -> Vec<String> {
    colorous::CATEGORY10.iter().map(|c| hex(*c)).collect()
}

/// Split a comma separated color option, dropping empty entries
pub fn parse_color_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Series colors: the chart's own list, else the configured default, else
/// the categorical palette
pub fn resolve_chart_colors(option: &str, configured: &[String]) -> Vec<String> {
    let own = parse_color_list(option);
    if !own.is_empty() {
        return own;
    }
    if !configured.is_empty() {
        return configured.to_vec();
    }
    categorical_palette()
}
