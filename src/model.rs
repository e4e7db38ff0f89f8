//! Magnitude model: signed integer → (bit length, amplitude bits).
//!
//! A value `v` is described by its *size*, the number of bits in `|v|`, and
//! an amplitude field of exactly that many bits. Positive values store
//! themselves; negative values store `v - 1`, whose low `size` bits have a
//! clear top bit. The decoder therefore recovers the sign from the top bit of
//! the field:
//!
//! ```text
//! value  size  field      decoded
//!   3     2     11          3
//!   1     1     1           1
//!   0     0     -           0
//!  -1     1     0         0 - 2 + 1 = -1
//!  -3     2     00        0 - 4 + 1 = -3
//! ```
//!
//! `i32::MIN` has no positive counterpart; it is the only value of size 32
//! and carries no amplitude field at all.

/// Size reserved for `i32::MIN`.
pub const MIN_VALUE_SIZE: u32 = 32;

/// Size and amplitude of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    /// Bits in the magnitude, 0..=32.
    pub size: u32,
    /// Amplitude; only the low `size` bits are transmitted.
    pub bits: i32,
}

/// Model `v` with the magnitude model.
#[inline]
pub fn magnitude(v: i32) -> Model {
    let size = u32::BITS - v.unsigned_abs().leading_zeros();
    let bits = if v < 0 && size < MIN_VALUE_SIZE { v - 1 } else { v };
    Model { size, bits }
}

/// Invert [`magnitude`]: rebuild a value from its size and the low `size`
/// bits of its amplitude.
#[inline]
pub fn reconstruct(size: u32, field: u32) -> i32 {
    match size {
        0 => 0,
        MIN_VALUE_SIZE => i32::MIN,
        _ => {
            let v = field as i32;
            if field < 1 << (size - 1) {
                v.wrapping_add((-1i32 << size).wrapping_add(1))
            } else {
                v
            }
        }
    }
}

/// Maps integers onto (size, amplitude) pairs for an integer coder.
pub trait Modeller {
    /// Describe `v`.
    fn model(&self, v: i32) -> Model;

    /// Rebuild a value from a size and its transmitted amplitude field.
    fn reconstruct(&self, size: u32, field: u32) -> i32;
}

/// The standard magnitude model.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnitudeModeller;

impl Modeller for MagnitudeModeller {
    fn model(&self, v: i32) -> Model {
        magnitude(v)
    }

    fn reconstruct(&self, size: u32, field: u32) -> i32 {
        reconstruct(size, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(size: u32, bits: i32) -> Model {
        Model { size, bits }
    }

    #[test]
    fn test_magnitude_small_values() {
        assert_eq!(magnitude(0), m(0, 0));
        assert_eq!(magnitude(1), m(1, 1));
        assert_eq!(magnitude(-1), m(1, -2));
        assert_eq!(magnitude(2), m(2, 2));
        assert_eq!(magnitude(3), m(2, 3));
        assert_eq!(magnitude(-2), m(2, -3));
        assert_eq!(magnitude(-3), m(2, -4));
        assert_eq!(magnitude(0xABCD), m(16, 0xABCD));
    }

    #[test]
    fn test_magnitude_extremes() {
        assert_eq!(magnitude(i32::MAX), m(31, i32::MAX));
        assert_eq!(magnitude(i32::MIN + 1), m(31, i32::MIN));
        assert_eq!(magnitude(i32::MIN), m(32, i32::MIN));
        assert_eq!(reconstruct(32, 0), i32::MIN);
    }

    #[test]
    fn test_negative_field_has_clear_top_bit() {
        for v in [-1, -2, -3, -100, -65535] {
            let Model { size, bits } = magnitude(v);
            let field = bits as u32 & ((1 << size) - 1);
            assert_eq!(field >> (size - 1), 0, "value {v}");
        }
    }

    proptest! {
        #[test]
        fn prop_reconstruct_inverts_magnitude(v in any::<i32>()) {
            let Model { size, bits } = magnitude(v);
            let field = if size == 0 || size >= 32 {
                bits as u32
            } else {
                bits as u32 & ((1 << size) - 1)
            };
            prop_assert_eq!(MagnitudeModeller.reconstruct(size, field), v);
        }
    }
}
