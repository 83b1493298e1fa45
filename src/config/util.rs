//! Utility functions for serde serialization.
//!
//! Predicates used with serde's `skip_serializing_if` attribute so default
//! values stay out of emitted JSON.

// ============================================================================
// Boolean Helpers
// ============================================================================

/// Returns `true` if the boolean value is `false`.
#[inline]
pub fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Numeric Zero Helpers
// ============================================================================

#[inline]
pub fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[inline]
pub fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

// ============================================================================
// String Helpers
// ============================================================================

/// Returns `true` if the string is empty.
///
/// Used with `#[serde(skip_serializing_if = "is_empty_str")]` on `String` fields.
#[inline]
pub fn is_empty_str(s: &str) -> bool {
    s.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_false() {
        assert!(is_false(&false));
        assert!(!is_false(&true));
    }

    #[test]
    fn test_is_zero() {
        assert!(is_zero_u32(&0));
        assert!(!is_zero_u32(&1));
        assert!(is_zero_u64(&0));
        assert!(!is_zero_u64(&42));
    }

    #[test]
    fn test_is_empty_str() {
        assert!(is_empty_str(""));
        assert!(!is_empty_str("x"));
    }
}
