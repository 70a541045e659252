use crate::change_detector::ChangeEvent;

/// `1234567` -> `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Shortest decimal form, so `5.0` prints as `5` and `7.25` as `7.25`.
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

pub fn jail_label(jailed: bool) -> &'static str {
    if jailed { "JAILED" } else { "UNJAILED" }
}

/// The message sent to every subscriber of a validator after one poll.
pub fn format_alert(operator_address: &str, events: &[ChangeEvent]) -> String {
    let lines: Vec<String> = events.iter().map(|e| format!("- {}", e)).collect();
    format!(
        "Attention! Validator status {} changed:\n\n{}",
        operator_address,
        lines.join("\n")
    )
}
