//! Text rendering of salaries and comparison lines

use crate::client::ComparisonInfo;

/// Format as US dollars with cents, e.g. `$95,000.50`
pub fn format_usd(amount: f64) -> String {
    format_money(amount, 2)
}

/// Format as whole US dollars, e.g. `$95,001`
pub fn format_usd_whole(amount: f64) -> String {
    format_money(amount, 0)
}

fn format_money(amount: f64, decimals: u32) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }

    let scale = 10u64.pow(decimals);
    let scaled = (amount.abs() * scale as f64).round() as u64;
    let whole = group_thousands(scaled / scale);
    let sign = if amount < 0.0 && scaled > 0 { "-" } else { "" };

    if decimals == 0 {
        format!("{sign}${whole}")
    } else {
        let frac = scaled % scale;
        format!("{sign}${whole}.{frac:0width$}", width = decimals as usize)
    }
}

fn group_thousands(value: u64) -> String {
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

/// One line of the comparison panel
pub fn comparison_sentence(info: &ComparisonInfo) -> String {
    format!(
        "On median, {} ({}) make {} {} than {}.",
        info.you,
        info.label,
        format_usd_whole(info.delta),
        if info.more { "more" } else { "less" },
        info.other
    )
}
