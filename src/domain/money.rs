use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 currency unit = 100 cents, so 250.50 = 25050 cents.
pub type Cents = i64;

/// Format cents as a human-readable amount string.
/// Example: 25050 -> "250.50", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string into cents, rejecting malformed input.
/// Used for interactively entered amounts where a typo should be an error.
/// Example: "250.50" -> 25050, "100" -> 10000, "12.5" -> 1250
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((u, d)) => {
            if d.contains('.') {
                return Err(ParseCentsError::InvalidFormat);
            }
            (u, d)
        }
        None => (digits, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Pad or truncate the decimal part to 2 digits, counting characters
    // rather than bytes so a stray multibyte symbol cannot split a char
    let truncated: String = decimal_str.chars().take(2).collect();
    let decimal: i64 = match truncated.chars().count() {
        0 => 0,
        1 => {
            truncated
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => truncated
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|u| u.checked_add(decimal))
        .ok_or(ParseCentsError::InvalidFormat)?;
    Ok(if negative { -cents } else { cents })
}

/// Parse an amount coming from an external record, coercing anything
/// unparsable (empty, missing, garbage) to zero instead of failing.
/// A bad amount in one imported row must never abort a whole batch.
pub fn parse_cents_lenient(input: &str) -> Cents {
    parse_cents(input).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(25050), "250.50");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-25050), "-250.50");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("250.50"), Ok(25050));
        assert_eq!(parse_cents("250"), Ok(25000));
        assert_eq!(parse_cents("12.34"), Ok(1234));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-250.50"), Ok(-25050));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("1.5€").is_err());
        assert!(parse_cents("١٢.٣٤").is_err());
    }

    #[test]
    fn test_parse_cents_overflow_is_an_error() {
        assert!(parse_cents("92233720368547758.08").is_err());
        assert!(parse_cents(&format!("{}", i64::MAX)).is_err());
    }

    #[test]
    fn test_parse_cents_lenient_coerces_to_zero() {
        assert_eq!(parse_cents_lenient("abc"), 0);
        assert_eq!(parse_cents_lenient(""), 0);
        assert_eq!(parse_cents_lenient("  "), 0);
        assert_eq!(parse_cents_lenient("12.34.56"), 0);
        assert_eq!(parse_cents_lenient("1.5€"), 0);
        assert_eq!(parse_cents_lenient("12.٣٤"), 0);
        assert_eq!(parse_cents_lenient(&format!("{}", i64::MAX)), 0);
    }

    #[test]
    fn test_parse_cents_lenient_passes_valid_through() {
        assert_eq!(parse_cents_lenient("250.50"), 25050);
        assert_eq!(parse_cents_lenient("-10"), -1000);
    }
}
