//! Number formatting shared by the TUI, text summary and exports.

/// Format an integer with comma thousands separators: `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a percentage value (already scaled to 0-100).
pub fn percent(value: f64, precision: usize) -> String {
    format!("{value:.precision$}%")
}

/// Horizontal bar of `width` cells scaled against `max`.
pub fn text_bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let cells = ((count as f64 / max as f64) * width as f64).round() as usize;
    "#".repeat(cells.min(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn formats_percent() {
        assert_eq!(percent(12.3456, 2), "12.35%");
        assert_eq!(percent(0.0, 3), "0.000%");
    }

    #[test]
    fn scales_text_bar() {
        assert_eq!(text_bar(5, 10, 10), "#####");
        assert_eq!(text_bar(10, 10, 4), "####");
        assert_eq!(text_bar(3, 0, 4), "");
    }
}
