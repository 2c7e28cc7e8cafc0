//! Timeout duration parsing.

/// Seconds per unit: s, m, h, d, w.
fn unit_seconds(unit: char) -> Option<u64> {
    match unit.to_ascii_lowercase() {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(60 * 60),
        'd' => Some(60 * 60 * 24),
        'w' => Some(60 * 60 * 24 * 7),
        _ => None,
    }
}

/// Parse a compound duration like `1d2h` or `10m` into total seconds.
///
/// The input is a sequence of `<integer><unit>` segments; the unit of
/// the final segment may be omitted and defaults to seconds. Returns
/// `None` for anything malformed, empty, or overflowing.
pub fn duration_to_seconds(input: &str) -> Option<u64> {
    let mut chars = input.chars().peekable();
    let mut total: u64 = 0;
    let mut any_segment = false;

    while chars.peek().is_some() {
        let mut value: u64 = 0;
        let mut any_digit = false;
        while let Some(c) = chars.peek().copied() {
            let Some(digit) = c.to_digit(10) else { break };
            value = value.checked_mul(10)?.checked_add(u64::from(digit))?;
            any_digit = true;
            chars.next();
        }
        if !any_digit {
            return None;
        }

        let multiplier = match chars.next() {
            Some(unit) => unit_seconds(unit)?,
            // Trailing bare integer counts as seconds.
            None => 1,
        };
        total = total.checked_add(value.checked_mul(multiplier)?)?;
        any_segment = true;
    }

    any_segment.then_some(total)
}
