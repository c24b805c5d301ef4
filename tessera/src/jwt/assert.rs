//! Primitive claim assertions
//!
//! These predicates are the smallest unit of claim checking: a value or
//! set of values from an untrusted payload, tested against the values a
//! policy allows. On failure they report both sides for diagnostics.

use crate::error::UnexpectedClaimValue;

/// Checks that `actual` is one of the allowed values
///
/// # Errors
///
/// Returns the offending and expected values if no allowed value matches.
pub fn value_among<'a, E>(actual: &str, allowed: E) -> Result<(), UnexpectedClaimValue>
where
    E: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    for candidate in allowed {
        if candidate == actual {
            return Ok(());
        }
        seen.push(candidate);
    }

    Err(UnexpectedClaimValue::new([actual], seen))
}

/// Checks that the actual set shares at least one value with the allowed set
///
/// # Errors
///
/// Returns the offending and expected values if the sets are disjoint; an
/// empty actual set never overlaps.
pub fn sets_overlap<'a, 'b, A, E>(actual: A, allowed: E) -> Result<(), UnexpectedClaimValue>
where
    A: IntoIterator<Item = &'a str>,
    E: IntoIterator<Item = &'b str>,
{
    let allowed: Vec<&str> = allowed.into_iter().collect();
    let mut seen = Vec::new();
    for value in actual {
        if allowed.contains(&value) {
            return Ok(());
        }
        seen.push(value);
    }

    Err(UnexpectedClaimValue::new(seen, allowed))
}
