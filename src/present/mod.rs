//! Output formatting. Finite values render as localized-style grouped
//! numbers; not-a-number renders as a dash ("cannot compute") and positive
//! infinity as "unreachable", so callers never print a raw sentinel.

pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let rounded = value.round();
    if rounded.abs() >= i64::MAX as f64 {
        return format!("{rounded:.0}");
    }
    let rounded = rounded as i64;
    if rounded < 0 {
        format!("-{}", group_thousands(rounded.unsigned_abs()))
    } else {
        group_thousands(rounded.unsigned_abs())
    }
}

pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    format!("{value:.1}%")
}

pub fn format_time_to_target(months: f64) -> String {
    if months == f64::INFINITY {
        return "unreachable".to_string();
    }
    if !months.is_finite() || months < 0.0 {
        return "-".to_string();
    }
    let total = months as u64;
    let years = total / 12;
    let rem = total % 12;
    if years == 0 {
        format!("{rem}m")
    } else {
        format!("{years}y {rem}m")
    }
}

fn group_thousands(mut value: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let chunk = value % 1_000;
        value /= 1_000;
        if value == 0 {
            groups.push(chunk.to_string());
            break;
        }
        groups.push(format!("{chunk:03}"));
    }
    groups.reverse();
    groups.join(",")
}
