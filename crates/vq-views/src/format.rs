//! Number formatting shared by every renderer
//!
//! Format codes follow the d3 (v3) specifier grammar:
//! `[[fill]align][sign][$][0][width][,][.precision][~][type]`. Supported
//! types are `f e g r s % p d n` and the empty type, which prints the number
//! the way a JavaScript runtime would.
//!
//! [`format_measure`] layers the portal's measure policy on top: `$` means
//! currency with as few decimals as needed, `s` rounds to one decimal before
//! SI formatting, anything else is used as a plain format code.

use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing a format code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid format specifier '{specifier}': unexpected '{rest}'")]
    InvalidSpecifier { specifier: String, rest: String },

    #[error("unsupported format type '{0}'")]
    UnsupportedType(char),
}

const SI_PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatType {
    Default,
    Fixed,
    Exponent,
    General,
    Rounded,
    Si,
    Percent,
    PercentRounded,
    Integer,
}

/// A parsed format code
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    fill: char,
    align: Align,
    sign: char,
    currency: bool,
    width: usize,
    comma: bool,
    precision: Option<usize>,
    trim: bool,
    kind: FormatType,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: Align::Right,
            sign: '-',
            currency: false,
            width: 0,
            comma: false,
            precision: None,
            trim: false,
            kind: FormatType::Default,
        }
    }
}

impl NumberFormat {
    pub fn parse(specifier: &str) -> Result<Self, FormatError> {
        specifier.parse()
    }

    /// Format a value
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }

        let negative = value < 0.0;
        let magnitude = value.abs();
        let mut suffix = "";

        let mut body = if magnitude.is_infinite() {
            "Infinity".to_string()
        } else {
            match self.kind {
                FormatType::Default => match self.precision {
                    Some(p) => to_precision(magnitude, p.clamp(1, 21)),
                    None => js_number_string(magnitude),
                },
                FormatType::Fixed => to_fixed(magnitude, self.precision.unwrap_or(0).min(20)),
                FormatType::Exponent => to_exponential(magnitude, self.precision.map(|p| p.min(20))),
                FormatType::General => match self.precision {
                    Some(p) => to_precision(magnitude, p.clamp(1, 21)),
                    None => js_number_string(magnitude),
                },
                FormatType::Rounded => rounded(magnitude, self.precision),
                FormatType::Si => {
                    let (scaled, symbol) = si_prefix(magnitude, self.precision);
                    suffix = symbol;
                    rounded(scaled, self.precision)
                }
                FormatType::Percent => {
                    suffix = "%";
                    to_fixed(magnitude * 100.0, self.precision.unwrap_or(0).min(20))
                }
                FormatType::PercentRounded => {
                    suffix = "%";
                    rounded(magnitude * 100.0, self.precision)
                }
                FormatType::Integer => to_fixed(magnitude, 0),
            }
        };

        if self.trim {
            body = trim_insignificant(&body);
        }
        if self.comma {
            body = group_thousands(&body);
        }

        let mut prefix = String::new();
        if negative {
            prefix.push('-');
        } else if self.sign != '-' {
            prefix.push(self.sign);
        }
        if self.currency {
            prefix.push('$');
        }

        let length = prefix.chars().count() + body.chars().count() + suffix.chars().count();
        let padding: String = if length < self.width {
            std::iter::repeat(self.fill).take(self.width - length).collect()
        } else {
            String::new()
        };

        match self.align {
            Align::Left => format!("{}{}{}{}", prefix, body, suffix, padding),
            Align::Right => format!("{}{}{}{}", padding, prefix, body, suffix),
            Align::AfterSign => format!("{}{}{}{}", prefix, padding, body, suffix),
            Align::Center => {
                let half = padding.chars().count() / 2;
                let left: String = padding.chars().take(half).collect();
                let right: String = padding.chars().skip(half).collect();
                format!("{}{}{}{}{}", left, prefix, body, suffix, right)
            }
        }
    }
}

impl FromStr for NumberFormat {
    type Err = FormatError;

    fn from_str(specifier: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = specifier.chars().collect();
        let mut format = NumberFormat::default();
        let mut i = 0;

        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        };

        if let Some(align) = chars.get(1).copied().and_then(align_of) {
            format.fill = chars[0];
            format.align = align;
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            format.align = align;
            i = 1;
        }

        if let Some(&c) = chars.get(i) {
            if matches!(c, '+' | '-' | ' ') {
                format.sign = c;
                i += 1;
            }
        }

        match chars.get(i) {
            Some('$') => {
                format.currency = true;
                i += 1;
            }
            Some('#') => i += 1,
            _ => {}
        }

        if chars.get(i) == Some(&'0') {
            format.fill = '0';
            format.align = Align::AfterSign;
            i += 1;
        }

        let start = i;
        while chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
            i += 1;
        }
        if i > start {
            format.width = chars[start..i].iter().collect::<String>().parse().unwrap_or(0);
        }

        if chars.get(i) == Some(&',') {
            format.comma = true;
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            let start = i + 1;
            let mut end = start;
            while chars.get(end).map_or(false, |c| c.is_ascii_digit()) {
                end += 1;
            }
            if end > start {
                format.precision = chars[start..end].iter().collect::<String>().parse().ok();
                i = end;
            }
        }

        if chars.get(i) == Some(&'~') {
            format.trim = true;
            i += 1;
        }

        if let Some(&c) = chars.get(i) {
            format.kind = match c {
                'f' => FormatType::Fixed,
                'e' => FormatType::Exponent,
                'g' => FormatType::General,
                'r' => FormatType::Rounded,
                's' => FormatType::Si,
                '%' => FormatType::Percent,
                'p' => FormatType::PercentRounded,
                'd' => FormatType::Integer,
                'n' => {
                    format.comma = true;
                    FormatType::General
                }
                c if c.is_ascii_alphabetic() => return Err(FormatError::UnsupportedType(c)),
                _ => FormatType::Default,
            };
            if format.kind != FormatType::Default {
                i += 1;
            }
        }

        if i < chars.len() {
            return Err(FormatError::InvalidSpecifier {
                specifier: specifier.to_string(),
                rest: chars[i..].iter().collect(),
            });
        }

        Ok(format)
    }
}

/// Format a measure value with the portal's data format policy
///
/// An unparseable code renders the value unformatted.
pub fn format_measure(code: &str, value: f64) -> String {
    let code = code.trim();
    let (specifier, value) = match code {
        "$" => (format!("$,.{}f", count_decimals(value, 2)), value),
        "s" => ("s".to_string(), js_round(value * 10.0) / 10.0),
        other => (other.to_string(), value),
    };

    match NumberFormat::parse(&specifier) {
        Ok(format) => format.format(value),
        Err(e) => {
            tracing::warn!("Falling back to the raw value: {}", e);
            js_number_string(value)
        }
    }
}

/// Decimals needed to show `value`, capped at `max`
pub fn count_decimals(value: f64, max: usize) -> usize {
    let needed = if (value * 10.0) % 1.0 != 0.0 {
        2
    } else if value % 1.0 != 0.0 {
        1
    } else {
        0
    };
    needed.min(max)
}

/// A number printed the way a JavaScript runtime prints it
pub fn js_number_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        js_exponent(&format!("{:e}", value))
    } else {
        format!("{}", value)
    }
}

/// `Math.round`: halves round towards positive infinity
fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// `Number.prototype.toFixed`
fn to_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    let scaled = value.abs() * scale;
    // exact ties round away from zero
    if scaled.fract() == 0.5 && scaled < 9.0e15 {
        let rounded = (scaled.trunc() + 1.0) / scale;
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}{:.*}", sign, digits, rounded);
    }
    format!("{:.*}", digits, value)
}

/// `Number.prototype.toExponential`
fn to_exponential(value: f64, digits: Option<usize>) -> String {
    match digits {
        Some(digits) => js_exponent(&format!("{:.*e}", digits, value)),
        None => js_exponent(&format!("{:e}", value)),
    }
}

/// `Number.prototype.toPrecision`
fn to_precision(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return to_fixed(0.0, precision.saturating_sub(1));
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let exponent: i32 = scientific
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent < -6 || exponent >= precision as i32 {
        js_exponent(&scientific)
    } else {
        let digits = (precision as i32 - 1 - exponent).max(0) as usize;
        to_fixed(value, digits)
    }
}

/// The `r` type: round to significant digits, print in fixed notation
fn rounded(value: f64, precision: Option<usize>) -> String {
    match precision {
        None | Some(0) => js_number_string(value),
        Some(p) => {
            let value = round_to(value, significant_decimals(value, p));
            let digits = significant_decimals(value * (1.0 + 1e-15), p).clamp(0, 20) as usize;
            to_fixed(value, digits)
        }
    }
}

/// Decimal places that keep `precision` significant digits of `value`
fn significant_decimals(value: f64, precision: usize) -> i32 {
    let magnitude = if value != 0.0 {
        value.abs().log10().ceil() as i32
    } else {
        1
    };
    precision as i32 - magnitude
}

fn round_to(value: f64, decimals: i32) -> f64 {
    if decimals == 0 {
        return js_round(value);
    }
    let scale = 10f64.powi(decimals);
    js_round(value * scale) / scale
}

/// Scale a non-negative value into SI range and return the prefix symbol
fn si_prefix(value: f64, precision: Option<usize>) -> (f64, &'static str) {
    if value == 0.0 {
        return (0.0, "");
    }

    let mut rounded_value = value;
    if let Some(p) = precision.filter(|p| *p > 0) {
        rounded_value = round_to(value, significant_decimals(value, p));
    }

    let digits = 1 + (1e-12 + rounded_value.log10()).floor() as i32;
    let exponent = ((digits - 1) as f64 / 3.0).floor() as i32 * 3;
    let exponent = exponent.clamp(-24, 24);

    let scaled = if exponent > 0 {
        value / 10f64.powi(exponent)
    } else {
        value * 10f64.powi(-exponent)
    };
    (scaled, SI_PREFIXES[(8 + exponent / 3) as usize])
}

/// Rust writes `1.5e21`, JavaScript writes `1.5e+21`
fn js_exponent(scientific: &str) -> String {
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => scientific.to_string(),
    }
}

/// Drop trailing zeros of the fractional part
fn trim_insignificant(body: &str) -> String {
    let (number, exponent) = match body.find('e') {
        Some(at) => body.split_at(at),
        None => (body, ""),
    };
    if !number.contains('.') {
        return body.to_string();
    }
    let trimmed = number.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exponent)
}

/// Insert `,` between thousands of the integer part
fn group_thousands(body: &str) -> String {
    let split = body.find(|c: char| c == '.' || c == 'e').unwrap_or(body.len());
    let (integer, rest) = body.split_at(split);
    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return body.to_string();
    }

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_policy() {
        assert_eq!(format_measure("$", 2512.3456), "$2,512.35");
        assert_eq!(format_measure("$", 2000.0), "$2,000");
        assert_eq!(format_measure("$", 2.5), "$2.5");
        assert_eq!(format_measure("$", -1234.0), "-$1,234");
    }

    #[test]
    fn test_si_policy() {
        assert_eq!(format_measure("s", 2500.0), "2.5k");
        assert_eq!(format_measure("s", 2549.96), "2.55k");
        assert_eq!(format_measure("s", 1234567.0), "1.234567M");
        assert_eq!(format_measure("s", 12.0), "12");
        assert_eq!(format_measure("s", 0.0), "0");
    }

    #[test]
    fn test_generic_codes() {
        assert_eq!(format_measure("", 2000.5), "2000.5");
        assert_eq!(format_measure(",.2f", 1234.5), "1,234.50");
        assert_eq!(format_measure(".1%", 0.256), "25.6%");
        assert_eq!(format_measure(",", 1234567.0), "1,234,567");
        assert_eq!(format_measure(".2s", 1500.0), "1.5k");
        assert_eq!(format_measure("d", 41.6), "42");
        assert_eq!(format_measure(".3e", 12346.0), "1.235e+4");
    }

    #[test]
    fn test_padding_and_sign() {
        assert_eq!(NumberFormat::parse("08.2f").unwrap().format(-3.5), "-0003.50");
        assert_eq!(NumberFormat::parse("*^9").unwrap().format(12.0), "***12****");
        assert_eq!(NumberFormat::parse("+.1f").unwrap().format(2.0), "+2.0");
        assert_eq!(NumberFormat::parse(".4~f").unwrap().format(2.5), "2.5");
    }

    #[test]
    fn test_bad_code_renders_literal() {
        assert!(matches!(
            NumberFormat::parse(".2fz"),
            Err(FormatError::InvalidSpecifier { .. })
        ));
        assert_eq!(
            NumberFormat::parse("x"),
            Err(FormatError::UnsupportedType('x'))
        );
        assert_eq!(format_measure("??", 12.5), "12.5");
    }

    #[test]
    fn test_js_number_string() {
        assert_eq!(js_number_string(3.0), "3");
        assert_eq!(js_number_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(js_number_string(1e21), "1e+21");
        assert_eq!(js_number_string(-0.0), "0");
        assert_eq!(js_number_string(f64::NAN), "NaN");
    }

    #[test]
    fn test_count_decimals() {
        assert_eq!(count_decimals(3.0, 2), 0);
        assert_eq!(count_decimals(3.5, 2), 1);
        assert_eq!(count_decimals(3.25, 2), 2);
        assert_eq!(count_decimals(3.25, 1), 1);
    }
}
