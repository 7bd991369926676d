//! en-GB style number formatting for prompt text.

const MISSING: &str = "N/A";

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Whole pounds with thousands separators, e.g. `£12,500` or `-£300`.
#[must_use]
pub fn format_currency(amount: Option<f64>) -> String {
    let Some(amount) = amount.filter(|a| a.is_finite()) else {
        return MISSING.to_string();
    };

    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}£{}", group_thousands(&format!("{:.0}", rounded.abs())))
}

/// Signed percentage with one decimal place, e.g. `+4.2%`.
#[must_use]
pub fn format_percent(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return MISSING.to_string();
    };

    let sign = if value > 0.0 { "+" } else { "" };
    format!("{sign}{value:.1}%")
}

/// Plain number with thousands separators and at most three decimals.
#[must_use]
pub fn format_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return MISSING.to_string();
    };

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');
    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    if frac.is_empty() {
        format!("{sign}{}", group_thousands(int_part))
    } else {
        format!("{sign}{}.{frac}", group_thousands(int_part))
    }
}

/// Renders an optional figure with a suffix, or `N/A`.
#[must_use]
pub fn or_na(value: Option<f64>, suffix: &str) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| MISSING.to_string(), |v| format!("{v}{suffix}"))
}
