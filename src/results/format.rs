use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberStyle {
    /// `n<d>`: thousands separators.
    Grouped(usize),
    /// `f<d>`: fixed point.
    Fixed(usize),
}

const DEFAULT_DECIMALS: usize = 2;

fn parse_style(format: &str) -> Option<NumberStyle> {
    let mut chars = format.trim().chars();
    let kind = chars.next()?;
    let digits = chars.as_str();
    let decimals = if digits.is_empty() {
        DEFAULT_DECIMALS
    } else {
        digits.parse::<usize>().ok()?
    };
    match kind.to_ascii_lowercase() {
        'n' => Some(NumberStyle::Grouped(decimals)),
        'f' => Some(NumberStyle::Fixed(decimals)),
        _ => None,
    }
}

/// Renders a summary value with a metadata format. Unknown formats and
/// values that are not numbers fall back to their natural text.
#[must_use]
pub fn format_value(format: &str, value: &Value) -> String {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };

    match (parse_style(format), number) {
        (Some(NumberStyle::Fixed(decimals)), Some(number)) => format!("{:.*}", decimals, number),
        (Some(NumberStyle::Grouped(decimals)), Some(number)) => {
            group_thousands(&format!("{:.*}", decimals, number))
        }
        _ => natural(value),
    }
}

fn natural(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn group_thousands(fixed: &str) -> String {
    let (sign, unsigned) = fixed
        .strip_prefix('-')
        .map_or(("", fixed), |rest| ("-", rest));
    let (integer, fraction) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(integer, fraction)| (integer, Some(fraction)));

    let mut grouped = String::with_capacity(fixed.len().saturating_mul(2));
    grouped.push_str(sign);
    let digits = integer.len();
    for (position, digit) in integer.chars().enumerate() {
        let remaining = digits.saturating_sub(position);
        if position > 0 && remaining.checked_rem(3) == Some(0) {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
