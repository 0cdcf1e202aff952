//! Human-readable byte quantities (`512`, `4k`, `2M`, `1G`).

use crate::error::{AccessError, Result};

const KIB: u64 = 1024;

/// Parse a decimal byte count with an optional `k`/`m`/`g` suffix (either case).
///
/// Suffixes are binary multiples. Negative values fail with
/// [`AccessError::OutOfRange`], anything non-numeric with [`AccessError::InvalidSize`].
pub fn parse_byte_size(text: &str) -> Result<u64> {
    let (digits, factor) = match text.chars().last() {
        Some('k' | 'K') => (&text[..text.len() - 1], KIB),
        Some('m' | 'M') => (&text[..text.len() - 1], KIB * KIB),
        Some('g' | 'G') => (&text[..text.len() - 1], KIB * KIB * KIB),
        _ => (text, 1),
    };

    let n: i64 = digits
        .parse()
        .map_err(|_| AccessError::InvalidSize(text.to_string()))?;
    if n < 0 {
        return Err(AccessError::OutOfRange(text.to_string()));
    }
    (n as u64)
        .checked_mul(factor)
        .ok_or_else(|| AccessError::OutOfRange(text.to_string()))
}
