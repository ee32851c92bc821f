use thiserror::Error;

/// Stored amounts are integer cents; 1 unit = 100 cents, so 50.00 = 5000.
pub type Cents = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),

    #[error("amount out of range: '{0}'")]
    OutOfRange(String),
}

/// Parse a decimal amount into cents.
///
/// Both `.` and `,` are accepted as the decimal separator. Digits past the
/// second decimal place are truncated.
/// Example: "50" -> 5000, "12,5" -> 1250, "-0.01" -> -1
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let normalized = input.trim().replace(',', ".");
    let invalid = || ParseCentsError::InvalidFormat(input.trim().to_string());

    let (negative, digits) = match normalized.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, normalized.as_str()),
    };
    let (units, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (units.is_empty() && fraction.is_empty()) || !all_digits(units) || !all_digits(fraction) {
        return Err(invalid());
    }

    let units: i64 = if units.is_empty() {
        0
    } else {
        units
            .parse()
            .map_err(|_| ParseCentsError::OutOfRange(input.trim().to_string()))?
    };
    let fraction: String = fraction.chars().chain(std::iter::repeat('0')).take(2).collect();
    let fraction: i64 = fraction.parse().map_err(|_| invalid())?;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(|| ParseCentsError::OutOfRange(input.trim().to_string()))?;
    Ok(if negative { -cents } else { cents })
}

/// Cents to currency units, for the metric series.
pub fn cents_to_units(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Format a currency amount with two decimals.
pub fn format_amount(value: f64) -> String {
    // Avoid rendering "-0.00".
    let value = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{:.2}", value)
}

/// Format an optional percentage; `None` renders as a dash.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "-".to_string(),
    }
}
