//! Canonicalization of operator-entered identifiers and positions
//!
//! Scanners and manual entry produce many textual forms of the same
//! physical address (`a1`, `A01`, `1A`, `A-1`). Everything downstream
//! compares canonical forms only, so both functions here are pure, total
//! and idempotent: malformed input falls back to a safe value, never an
//! error.

/// Canonicalize a free-text sample identifier: trim and uppercase.
///
/// Empty or whitespace-only input yields the empty string.
#[must_use]
pub fn normalize_sample_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Canonicalize a position token to `<LETTERS><NUMBER>` form.
///
/// - `A01` → `A1` (leading zeros stripped)
/// - `14A` → `A14` (scanner-reversed order flipped)
/// - `"b-2"` → `B2` (quotes and separators stripped)
/// - pure-numeric and pure-alphabetic tokens pass through unchanged
/// - any other shape returns the trimmed uppercased string as-is
#[must_use]
pub fn normalize_position(raw: &str) -> String {
    let mut s = raw.trim().to_uppercase();
    if s.is_empty() {
        return s;
    }

    // Strip one layer of surrounding quotes, then separators
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s = s[1..s.len() - 1].trim().to_string();
    }
    s.retain(|c| !matches!(c, '-' | '_') && !c.is_whitespace());
    if s.is_empty() {
        return s;
    }

    let letters_len = s.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let digits_len = s.chars().take_while(|c| c.is_ascii_digit()).count();

    // Already LETTERS+DIGITS: strip leading zeros in the numeric part
    if letters_len > 0 && letters_len < s.len() {
        let (letters, rest) = s.split_at(letters_len);
        if rest.chars().all(|c| c.is_ascii_digit()) {
            let number = rest.trim_start_matches('0');
            let number = if number.is_empty() { "0" } else { number };
            return format!("{letters}{number}");
        }
    }

    // DIGITS+LETTERS: flip to canonical order
    if digits_len > 0 && digits_len < s.len() {
        let (digits, rest) = s.split_at(digits_len);
        if rest.chars().all(|c| c.is_ascii_alphabetic()) {
            let number = digits.trim_start_matches('0');
            let number = if number.is_empty() { "0" } else { number };
            return format!("{rest}{number}");
        }
    }

    // Pure-numeric, pure-alphabetic, or unrecognized shape: pass through
    s
}
