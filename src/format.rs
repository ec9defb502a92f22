/// Display helpers for tooltips and labels.

/// Narrow no-break space, the fr-FR grouping separator.
const GROUP_SEPARATOR: char = '\u{202f}';

/// Round halves towards positive infinity (`Math.round` semantics).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// fr-FR number with no fraction digits: `1234567.4` → `1 234 567`.
pub fn number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = round_half_up(value);
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(c);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Share of `part` in `whole` as a percentage; zero when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_narrow_spaces() {
        assert_eq!(number(1000.0), "1\u{202f}000");
        assert_eq!(number(1234567.4), "1\u{202f}234\u{202f}567");
        assert_eq!(number(999.5), "1\u{202f}000");
        assert_eq!(number(-4500.0), "-4\u{202f}500");
        assert_eq!(number(12.0), "12");
    }

    #[test]
    fn rounds_halves_upwards() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(31.43), 31.0);
    }

    #[test]
    fn percentage_of_empty_whole_is_zero() {
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert!((percentage(1000.0, 3500.0) - 28.571).abs() < 0.001);
    }
}
