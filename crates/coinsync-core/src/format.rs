//! Currency display formatting.

/// How an amount in one currency is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub symbol: &'static str,
    pub thousands_separator: char,
    pub decimal_separator: char,
    /// Digits after the decimal separator.
    pub precision: usize,
}

impl CurrencyFormat {
    pub const fn usd() -> Self {
        Self {
            symbol: "$",
            thousands_separator: ',',
            decimal_separator: '.',
            precision: 2,
        }
    }

    pub const fn ngn() -> Self {
        Self {
            symbol: "\u{20a6}",
            thousands_separator: ',',
            decimal_separator: '.',
            precision: 2,
        }
    }

}

/// Render `value` as e.g. `$1,234.50` or `-₦12.00`.
///
/// NaN and infinities render as `-`.
pub fn format_currency(value: f64, format: &CurrencyFormat) -> String {
    if !value.is_finite() {
        return String::from("-");
    }

    let digits = format!("{:.*}", format.precision, value.abs());
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };
    let is_zero = digits.bytes().all(|b| b == b'0' || b == b'.');

    let mut out = String::with_capacity(digits.len() + whole.len() / 3 + 4);
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    out.push_str(format.symbol);

    let len = whole.len();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push(format.thousands_separator);
        }
        out.push(digit);
    }

    if let Some(fraction) = fraction {
        out.push(format.decimal_separator);
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_and_pads_precision() {
        let usd = CurrencyFormat::usd();

        assert_eq!(format_currency(1_234_567.5, &usd), "$1,234,567.50");
        assert_eq!(format_currency(999.0, &usd), "$999.00");
        assert_eq!(format_currency(1000.0, &usd), "$1,000.00");
        assert_eq!(format_currency(0.004, &usd), "$0.00");
    }

    #[test]
    fn negative_sign_precedes_symbol() {
        assert_eq!(format_currency(-812.25, &CurrencyFormat::ngn()), "-\u{20a6}812.25");
    }

    #[test]
    fn values_rounding_to_zero_carry_no_sign() {
        assert_eq!(format_currency(-0.001, &CurrencyFormat::usd()), "$0.00");
        assert_eq!(format_currency(-0.0, &CurrencyFormat::usd()), "$0.00");
    }

    #[test]
    fn non_finite_values_render_as_dash() {
        let usd = CurrencyFormat::usd();
        assert_eq!(format_currency(f64::NAN, &usd), "-");
        assert_eq!(format_currency(f64::NEG_INFINITY, &usd), "-");
    }

    #[test]
    fn custom_separators_and_zero_precision() {
        let format = CurrencyFormat {
            symbol: "EUR ",
            thousands_separator: '.',
            decimal_separator: ',',
            precision: 0,
        };
        assert_eq!(format_currency(1_261_234_567_890.0, &format), "EUR 1.261.234.567.890");
    }

}
