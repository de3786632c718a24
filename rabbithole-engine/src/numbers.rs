//! Numeric conversion helpers centralizing rounding and lossy casts.

use num_traits::cast::cast;

/// Round half-up (`floor(x + 0.5)`), returning 0.0 for non-finite values.
///
/// Unlike [`f64::round`], ties move toward positive infinity, so `-2.5`
/// becomes `-2.0`.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value + 0.5).floor()
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a turn counter to f64.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Floor a f64 into an index in `0..len`, clamping out-of-range values.
///
/// Returns `None` for an empty range.
#[must_use]
pub fn f64_to_index(value: f64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let last = len - 1;
    if !value.is_finite() || value <= 0.0 {
        return Some(0);
    }
    let idx = cast::<f64, usize>(value.floor()).unwrap_or(last);
    Some(idx.min(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_up_rounds_ties_toward_positive_infinity() {
        assert!((round_half_up(2.5) - 3.0).abs() < f64::EPSILON);
        assert!((round_half_up(-2.5) + 2.0).abs() < f64::EPSILON);
        assert!((round_half_up(14.4) - 14.0).abs() < f64::EPSILON);
        assert!((round_half_up(f64::NAN) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn index_conversion_clamps() {
        assert_eq!(f64_to_index(2.9, 3), Some(2));
        assert_eq!(f64_to_index(3.0, 3), Some(2));
        assert_eq!(f64_to_index(-1.0, 3), Some(0));
        assert_eq!(f64_to_index(f64::NAN, 3), Some(0));
        assert_eq!(f64_to_index(0.5, 0), None);
    }

    #[test]
    fn counts_convert() {
        assert!((usize_to_f64(7) - 7.0).abs() < f64::EPSILON);
        assert!((u32_to_f64(3) - 3.0).abs() < f64::EPSILON);
    }
}
