//! Quantized color scale and its legend

use serde::Serialize;

use crate::format::js_number_string;

/// Offset added to the lowest grade so it falls inside the first bucket
const GRADE_EPSILON: f64 = 1e-10;

/// Maps a continuous domain onto a discrete palette in equal-width buckets
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeScale {
    min: f64,
    max: f64,
    range: Vec<String>,
}

/// One legend row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,

    /// Lower bound of the bucket; `None` for the no-data entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
}

impl QuantizeScale {
    /// `None` when the palette is empty or the domain is not finite
    pub fn new(domain: [f64; 2], range: Vec<String>) -> Option<Self> {
        let [min, max] = domain;
        if range.is_empty() || !min.is_finite() || !max.is_finite() {
            return None;
        }
        Some(Self { min, max, range })
    }

    /// Extent of the values, ignoring NaN
    pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<[f64; 2]> {
        values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(None, |extent, v| {
                Some(match extent {
                    Some([lo, hi]) => [f64::min(lo, v), f64::max(hi, v)],
                    None => [v, v],
                })
            })
    }

    pub fn domain(&self) -> [f64; 2] {
        [self.min, self.max]
    }

    pub fn range(&self) -> &[String] {
        &self.range
    }

    /// Whether the domain collapses to a single value
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    fn top(&self) -> &str {
        self.range.last().map(String::as_str).unwrap_or_default()
    }

    /// Color of a value; values outside the domain clamp to the ends
    pub fn color(&self, value: f64) -> &str {
        if self.is_degenerate() || value.is_nan() {
            return self.top();
        }

        let n = self.range.len();
        let t = n as f64 * (value - self.min) / (self.max - self.min);
        let index = (t.floor().max(0.0) as usize).min(n - 1);
        &self.range[index]
    }

    /// One entry per bucket, lowest first, closed by the no-data entry
    ///
    /// Every entry reads `from–to` except the last, which is open-ended
    /// (`from+`).
    pub fn legend(&self, no_data_color: &str) -> Vec<LegendEntry> {
        let mut entries = Vec::with_capacity(self.range.len() + 1);

        if self.is_degenerate() {
            entries.push(LegendEntry {
                color: self.top().to_string(),
                label: format!("{}+", legend_number(self.min)),
                from: Some(self.min),
            });
        } else {
            let low = self.min + GRADE_EPSILON;
            let step = (self.max - low) / self.range.len() as f64;
            let grades: Vec<f64> = (0..self.range.len())
                .map(|i| low + step * i as f64)
                .collect();

            for (i, (grade, color)) in grades.iter().zip(&self.range).enumerate() {
                let label = match grades.get(i + 1) {
                    Some(next) => format!("{}\u{2013}{}", legend_number(*grade), legend_number(*next)),
                    None => format!("{}+", legend_number(*grade)),
                };
                entries.push(LegendEntry {
                    color: color.clone(),
                    label,
                    from: Some(*grade),
                });
            }
        }

        entries.push(LegendEntry {
            color: no_data_color.to_string(),
            label: "No data".to_string(),
            from: None,
        });
        entries
    }
}

/// Two decimals for fractional numbers, the plain number otherwise
pub fn legend_number(value: f64) -> String {
    if value.fract() != 0.0 {
        format!("{:.2}", value)
    } else {
        js_number_string(value)
    }
}
