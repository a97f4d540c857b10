// Panel value conversions
//
// The panel encodes booleans as ON/OFF or yes/no depending on the
// command, and reports "unlimited" (or 0) for unbounded quotas. These
// helpers normalize both directions.

/// Parse the panel's assorted boolean spellings.
pub fn to_bool(value: &str) -> bool {
    matches!(value, "yes" | "ON" | "on" | "1" | "true")
}

/// Encode a flag in the ON/OFF spelling (account and domain features).
pub fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

/// Encode a flag in the yes/no spelling (suspension, confirmation keys).
pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Parse a quota that may be "unlimited". Zero also means unbounded;
/// the panel reports both spellings depending on version.
pub fn parse_limit(value: Option<&str>) -> Option<f64> {
    let parsed = value?.trim().parse::<f64>().ok()?;
    (parsed != 0.0).then_some(parsed)
}

/// Integer variant of [`parse_limit`] for counted quotas (domains,
/// databases).
pub fn parse_count_limit(value: Option<&str>) -> Option<u32> {
    let parsed = value?.trim().parse::<u32>().ok()?;
    (parsed != 0).then_some(parsed)
}

/// Parse a numeric usage figure, treating absent or malformed values as
/// zero the way PHP's floatval does.
pub fn parse_usage(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Split a pipe-delimited list, dropping empty segments.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_and_zero_mean_no_ceiling() {
        assert_eq!(parse_limit(Some("unlimited")), None);
        assert_eq!(parse_limit(Some("0")), None);
        assert_eq!(parse_limit(Some("1024.5")), Some(1024.5));
        assert_eq!(parse_limit(None), None);
        assert_eq!(parse_count_limit(Some("unlimited")), None);
        assert_eq!(parse_count_limit(Some("5")), Some(5));
    }

    #[test]
    fn boolean_spellings() {
        assert!(to_bool("yes"));
        assert!(to_bool("ON"));
        assert!(!to_bool("no"));
        assert!(!to_bool("OFF"));
        assert_eq!(on_off(true), "ON");
        assert_eq!(yes_no(false), "no");
    }

    #[test]
    fn pipe_lists_drop_empty_segments() {
        assert_eq!(split_list("a.nl|b.nl"), vec!["a.nl", "b.nl"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn usage_defaults_to_zero() {
        assert_eq!(parse_usage(Some("12.5")), 12.5);
        assert_eq!(parse_usage(Some("garbage")), 0.0);
        assert_eq!(parse_usage(None), 0.0);
    }
}
