// Number formatting shared by report builders and log lines.

/// Formats a ratio as a percentage, e.g. `0.0312` -> `"3.12%"`.
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

pub fn format_decimal(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}", value, decimals = decimals)
}

/// Like [`format_decimal`] / [`format_percent`] but renders undefined values as `n/a`.
pub fn format_optional(value: Option<f64>, decimals: usize, as_percent: bool) -> String {
    match value {
        Some(v) if v.is_finite() => {
            if as_percent {
                format_percent(v, decimals)
            } else {
                format_decimal(v, decimals)
            }
        }
        _ => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.0312, 2), "3.12%");
        assert_eq!(format_percent(-0.5, 0), "-50%");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(0.71234), 2, false), "0.71");
        assert_eq!(format_optional(Some(0.03), 1, true), "3.0%");
        assert_eq!(format_optional(None, 2, false), "n/a");
        assert_eq!(format_optional(Some(f64::NAN), 2, true), "n/a");
    }
}
