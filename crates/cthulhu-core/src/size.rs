//! Human-readable size strings ("16MB", "4MiB", "1.5GiB") to byte counts.

/// Error from [`parse_size`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeParseError {
    #[error("empty size string")]
    Empty,
    #[error("invalid number in size {0:?}")]
    InvalidNumber(String),
    #[error("unknown size unit {0:?}")]
    UnknownUnit(String),
    #[error("size {0:?} does not fit in 64 bits")]
    Overflow(String),
}

const UNITS: &[(&str, u64)] = &[
    ("", 1),
    ("B", 1),
    ("KB", 1_000),
    ("KIB", 1 << 10),
    ("MB", 1_000_000),
    ("MIB", 1 << 20),
    ("GB", 1_000_000_000),
    ("GIB", 1 << 30),
    ("TB", 1_000_000_000_000),
    ("TIB", 1 << 40),
];

/// Parses a size string, case-insensitive. A bare integer is bytes; decimal
/// (`KB`, `MB`, ...) and binary (`KiB`, `MiB`, ...) units are accepted.
/// Fractions are truncated toward zero (`1.5KB` → 1500, `0.5B` → 0).
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let s = input.trim().to_ascii_uppercase();
    if s.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let unit = unit.trim();

    let factor = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, f)| *f)
        .ok_or_else(|| SizeParseError::UnknownUnit(unit.to_string()))?;

    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
        return Err(SizeParseError::InvalidNumber(input.trim().to_string()));
    }

    let overflow = || SizeParseError::Overflow(input.trim().to_string());
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut bytes = whole.checked_mul(factor).ok_or_else(overflow)?;

    if !frac.is_empty() {
        // Fraction precision is capped at 18 digits.
        let digits = &frac[..frac.len().min(18)];
        let num: u128 = digits.parse().map_err(|_| overflow())?;
        let den = 10u128.pow(digits.len() as u32);
        let part = u64::try_from(u128::from(factor) * num / den).map_err(|_| overflow())?;
        bytes = bytes.checked_add(part).ok_or_else(overflow)?;
    }
    Ok(bytes)
}
