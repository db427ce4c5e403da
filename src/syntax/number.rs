/// Parse a numeric literal into its value.
///
/// The base is picked from the prefix alone: `%` binary, `$` hex, a leading `0` octal and
/// decimal otherwise. `None` is returned when the digits do not belong to the base or the value
/// does not fit, never a panic.
pub fn parse_number(text: &str) -> Option<i64> {
    let (digits, radix) = if let Some(binary) = text.strip_prefix('%') {
        (binary, 2)
    } else if let Some(hex) = text.strip_prefix('$') {
        (hex, 16)
    } else if text.starts_with('0') {
        (text, 8)
    } else {
        (text, 10)
    };

    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }

    i64::from_str_radix(digits, radix).ok()
}

/// Value of a `'c` character literal.
pub fn parse_char(text: &str) -> Option<i64> {
    let mut chars = text.strip_prefix('\'')?.chars();
    let ch = chars.next()?;
    match chars.next() {
        None => Some(ch as i64),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        let tests = vec![
            ("%0", Some(0)),
            ("%1010", Some(0b1010)),
            ("%11111111", Some(0xFF)),
            ("$00", Some(0)),
            ("$ff", Some(0xFF)),
            ("$FF", Some(0xFF)),
            ("$100", Some(0x100)),
            ("$BEEF", Some(0xBEEF)),
            ("0", Some(0)),
            ("017", Some(0o17)),
            ("0777", Some(0o777)),
            ("255", Some(255)),
            ("256", Some(256)),
            ("65535", Some(65535)),
        ];
        for (input, expected) in tests {
            assert_eq!(parse_number(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_digits_outside_base_are_not_a_number() {
        let tests = vec![
            "%102", "%", "%1_0", "$", "$G1", "$1H", "08", "019", "12AB", "1_000", "",
        ];
        for input in tests {
            assert_eq!(parse_number(input), None, "{}", input);
        }
    }

    #[test]
    fn test_overflow_is_not_a_number() {
        assert_eq!(parse_number("$FFFFFFFFFFFFFFFFFF"), None);
        assert_eq!(parse_number("99999999999999999999999"), None);
    }

    #[test]
    fn test_parse_char() {
        assert_eq!(parse_char("'A"), Some(65));
        assert_eq!(parse_char("' "), Some(32));
        assert_eq!(parse_char("'"), None);
        assert_eq!(parse_char("A"), None);
    }
}
