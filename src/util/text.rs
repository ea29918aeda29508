use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};

const NUMBER_ESCAPE_CHAR: &[char] = &['元', '%', ',', ' ', '"', '\n'];

/// Parses an `f64` value from a given string.
///
/// 證交所回傳的數值都是字串，尚未成交時會是 `-`，這類值會回傳錯誤。
///
/// # Arguments
///
/// * `s`: A string slice that may include commas as thousands separators.
/// * `escape_chars`: Additional characters to be removed before parsing.
///
/// # Example
///
/// ```
/// let price = parse_f64("17,000.50", None).unwrap();
/// ```
pub fn parse_f64(s: &str, escape_chars: Option<Vec<char>>) -> Result<f64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    let value = f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because {:?}", cleaned, why))?;

    if !value.is_finite() {
        return Err(anyhow!("'{}' is not a finite number", cleaned));
    }

    Ok(value)
}

/// Removes the number escape characters plus `escape_chars` from `s`.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}
