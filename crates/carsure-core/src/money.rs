//! Rupee/dollar formatting and lenient amount parsing.

use crate::types::CostAmount;

/// Fixed INR→USD divisor. Not live, not configurable.
pub const INR_PER_USD: f64 = 83.0;

/// Formats a rupee amount with Indian digit grouping: `₹1,25,000`.
///
/// Fractions are rounded to the nearest rupee. Negative input renders with a
/// leading minus sign.
#[must_use]
pub fn format_rupees(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}₹{}", group_indian(rounded_whole(amount.abs())))
}

/// Formats a rupee amount converted to dollars with western grouping: `$1,506`.
#[must_use]
pub fn format_dollars_from_inr(amount_inr: f64) -> String {
    let usd = amount_inr / INR_PER_USD;
    let sign = if usd < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_western(rounded_whole(usd.abs())))
}

/// Builds a [`CostAmount`] for a rupee figure.
#[must_use]
pub fn cost_amount(amount_inr: f64) -> CostAmount {
    let amount = amount_inr.round();
    CostAmount {
        rupees: format_rupees(amount),
        dollars: format_dollars_from_inr(amount),
        amount,
    }
}

/// Parses the digits out of a money string such as `₹1,25,000` or `$1,200.50`.
///
/// Currency symbols, commas, and whitespace are ignored. Returns `None` if
/// no digits are present.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_whole(value: f64) -> u64 {
    value.round() as u64
}

fn group_western(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Last three digits, then groups of two: 12,34,567.
fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupees_use_indian_grouping() {
        assert_eq!(format_rupees(0.0), "₹0");
        assert_eq!(format_rupees(950.0), "₹950");
        assert_eq!(format_rupees(15_000.0), "₹15,000");
        assert_eq!(format_rupees(125_000.0), "₹1,25,000");
        assert_eq!(format_rupees(12_345_678.0), "₹1,23,45,678");
    }

    #[test]
    fn dollars_use_fixed_divisor() {
        assert_eq!(format_dollars_from_inr(8_300.0), "$100");
        assert_eq!(format_dollars_from_inr(8_300_000.0), "$100,000");
        assert_eq!(format_dollars_from_inr(0.0), "$0");
    }

    #[test]
    fn parse_amount_strips_symbols() {
        assert_eq!(parse_amount("₹1,25,000"), Some(125_000.0));
        assert_eq!(parse_amount("$1,200.50"), Some(1_200.5));
        assert_eq!(parse_amount("Unknown"), None);
    }

    #[test]
    fn cost_amount_rounds_to_whole_rupees() {
        let c = cost_amount(1_234.6);
        assert_eq!(c.rupees, "₹1,235");
        assert!((c.amount - 1_235.0).abs() < f64::EPSILON);
    }
}
