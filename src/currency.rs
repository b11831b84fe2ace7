use num_format::{Locale, ToFormattedString};

/// Formats an amount as US dollars, e.g. `$12,345.60` or `-$3.00`.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "--".to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{fraction:02}", whole.to_formatted_string(&Locale::en))
}
