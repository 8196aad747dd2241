//! Kernel command line helpers.
//!
//! The command line is a whitespace-separated list of `key` or `key=value`
//! tokens. Later tokens win when a key repeats.

pub fn parse_bool(value: &str) -> Option<bool> {
    const TRUE: [&str; 5] = ["on", "true", "yes", "enabled", "1"];
    const FALSE: [&str; 5] = ["off", "false", "no", "disabled", "0"];

    if TRUE.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
pub fn parse_u64(value: &str) -> Option<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u64>().ok()
    }
}

/// Value of the last `key=value` token for `key`.
pub fn option_value<'a>(cmdline: &'a str, key: &str) -> Option<&'a str> {
    cmdline
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .last()
}

/// All `(key, value)` pairs whose key starts with `prefix`, in order.
/// Bare tokens yield an empty value.
pub fn options_with_prefix<'a>(
    cmdline: &'a str,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    cmdline
        .split_whitespace()
        .map(|token| token.split_once('=').unwrap_or((token, "")))
        .filter(move |(k, _)| k.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Disabled"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_u64_radix() {
        assert_eq!(parse_u64("500000"), Some(500_000));
        assert_eq!(parse_u64("0x1F"), Some(31));
        assert_eq!(parse_u64("-1"), None);
        assert_eq!(parse_u64(""), None);
    }

    #[test]
    fn test_option_value_last_wins() {
        let line = "quiet klog=debug acpi=off klog=trace";
        assert_eq!(option_value(line, "klog"), Some("trace"));
        assert_eq!(option_value(line, "acpi"), Some("off"));
        assert_eq!(option_value(line, "quiet"), None);
    }

    #[test]
    fn test_options_with_prefix() {
        let line = "root=/dev/sda acpi.slp_typ=7 acpi=on acpi.enable_polls=10";
        let mut it = options_with_prefix(line, "acpi");
        assert_eq!(it.next(), Some(("acpi.slp_typ", "7")));
        assert_eq!(it.next(), Some(("acpi", "on")));
        assert_eq!(it.next(), Some(("acpi.enable_polls", "10")));
        assert_eq!(it.next(), None);
    }
}
