/// Insert thousands separators into a whole-dollar amount
fn group_thousands(dollars: u64) -> String {
    let digits = dollars.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a currency value without cents, e.g. `$1,245,000`
pub fn format_currency(value: f64) -> String {
    let dollars = group_thousands(value.abs().round() as u64);
    if value < -0.5 {
        format!("-${dollars}")
    } else {
        format!("${dollars}")
    }
}

/// Format a rate as a percentage, e.g. `0.22` as `22.0%`
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Format a currency value in compact form (e.g., $2.1M, $450K, $50)
pub fn format_compact_currency(value: f64) -> String {
    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs_value >= 1_000_000.0 {
        format!("{}${:.1}M", sign, abs_value / 1_000_000.0)
    } else if abs_value >= 1_000.0 {
        format!("{}${:.0}K", sign, abs_value / 1_000.0)
    } else {
        format!("{}${:.0}", sign, abs_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_000.0), "$1,000");
        assert_eq!(format_currency(220_400.0), "$220,400");
        assert_eq!(format_currency(1_245_000.0), "$1,245,000");
        assert_eq!(format_currency(-17_600.0), "-$17,600");
    }

    #[test]
    fn test_format_compact_currency() {
        assert_eq!(format_compact_currency(2_130_000.0), "$2.1M");
        assert_eq!(format_compact_currency(450_000.0), "$450K");
        assert_eq!(format_compact_currency(50.0), "$50");
        assert_eq!(format_compact_currency(-1_500_000.0), "-$1.5M");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.22), "22.0%");
        assert_eq!(format_percentage(0.055), "5.5%");
    }
}
