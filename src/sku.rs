use std::cmp::Ordering;
use thiserror::Error;

/// SKU offered to a session when no counter has been persisted yet.
pub const DEFAULT_SKU: &str = "SKU-1000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("sku is empty")]
    Empty,
    #[error("sku `{0}` has no trailing number to increment")]
    MissingNumber(String),
}

/// A SKU split into its free-form prefix and trailing digit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuParts<'a> {
    pub prefix: &'a str,
    pub digits: &'a str,
}

pub fn split(sku: &str) -> Result<SkuParts<'_>, SkuError> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(SkuError::Empty);
    }
    let boundary = trimmed
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .len();
    if boundary == trimmed.len() {
        return Err(SkuError::MissingNumber(trimmed.to_string()));
    }
    Ok(SkuParts {
        prefix: &trimmed[..boundary],
        digits: &trimmed[boundary..],
    })
}

/// Checks that `sku` can act as a batch key and be auto-incremented.
pub fn validate(sku: &str) -> Result<String, SkuError> {
    split(sku)?;
    Ok(sku.trim().to_string())
}

/// Adds one to the trailing digit run, keeping the prefix and the digit width
/// (`SKU-099` becomes `SKU-100`, `A9` becomes `A10`).
pub fn increment(sku: &str) -> Result<String, SkuError> {
    let parts = split(sku)?;
    let mut digits: Vec<u8> = parts.digits.bytes().collect();
    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            carry = false;
            break;
        }
    }

    let mut next = String::with_capacity(parts.prefix.len() + digits.len() + 1);
    next.push_str(parts.prefix);
    if carry {
        next.push('1');
    }
    next.extend(digits.iter().map(|d| char::from(*d)));
    Ok(next)
}

/// Orders SKUs by prefix, then by numeric value of the suffix.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (split(a), split(b)) {
        (Ok(left), Ok(right)) => left
            .prefix
            .cmp(right.prefix)
            .then_with(|| compare_digits(left.digits, right.digits))
            .then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
