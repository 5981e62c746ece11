//! Console table helpers. Output stays plain fixed-width text so it pipes
//! cleanly into grep/awk.

/// Truncate with a ".." suffix when the value exceeds the column width.
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_len.saturating_sub(2)).collect();
    format!("{kept}..")
}

/// `$1,234.56` style money formatting.
pub fn money(amount: f64) -> String {
    let negative = amount < 0.0;
    let formatted = format!("{:.2}", amount.abs());
    let (integral, cents) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let grouped = group_thousands(integral);
    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

/// Money with an explicit sign, for delta columns: `+$200.00`, `-$50.25`.
pub fn signed_money(amount: f64) -> String {
    if amount < 0.0 {
        money(amount)
    } else {
        format!("+{}", money(amount))
    }
}

/// Render an amount in its currency; only USD gets the `$` shorthand.
pub fn money_in(amount: f64, currency: &str) -> String {
    if currency == "USD" {
        money(amount)
    } else {
        format!("{amount:.2} {currency}")
    }
}

fn group_thousands(integral: &str) -> String {
    let digits: Vec<char> = integral.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}
