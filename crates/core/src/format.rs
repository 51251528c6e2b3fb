//! Display helpers for won amounts.

/// `1234000` → `"1,234,000원"`.
pub fn format_krw(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped}원")
}

/// Coarse price band used by catalog filters.
pub fn budget_band(amount: i64) -> &'static str {
    match amount {
        ..=499_999 => "under 500k",
        500_000..=699_999 => "500k-700k",
        700_000..=999_999 => "700k-1M",
        1_000_000..=1_499_999 => "1M-1.5M",
        1_500_000..=1_999_999 => "1.5M-2M",
        2_000_000..=2_999_999 => "2M-3M",
        _ => "3M and above",
    }
}

#[cfg(test)]
mod tests {
    use super::{budget_band, format_krw};

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(format_krw(0), "0원");
        assert_eq!(format_krw(999), "999원");
        assert_eq!(format_krw(1_000), "1,000원");
        assert_eq!(format_krw(1_234_000), "1,234,000원");
        assert_eq!(format_krw(-45_000), "-45,000원");
    }

    #[test]
    fn bands_have_exclusive_upper_bounds() {
        assert_eq!(budget_band(499_999), "under 500k");
        assert_eq!(budget_band(500_000), "500k-700k");
        assert_eq!(budget_band(1_000_000), "1M-1.5M");
        assert_eq!(budget_band(2_999_999), "2M-3M");
        assert_eq!(budget_band(3_000_000), "3M and above");
    }
}
