//! Label shortening

/// Category axis labels longer than 13 characters keep 11 plus `...`
pub fn truncate_category(label: &str) -> String {
    if label.chars().count() > 13 {
        let head: String = label.chars().take(11).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Subtitle and description lines keep 30 characters plus `...`
pub fn truncate_line(line: &str) -> String {
    if line.chars().count() > 30 {
        let head: String = line.chars().take(30).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}
