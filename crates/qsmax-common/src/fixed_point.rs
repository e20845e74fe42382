//! Fixed-point formats and values.
//!
//! A value in format `{bit_width, fractional_bits, signed}` is stored as a
//! raw integer that fits in `bit_width` bits (two's complement when
//! signed) and represents `raw * 2^-fractional_bits`.
//!
//! Every conversion into a format uses the same policy: round to nearest
//! with ties away from zero, then saturate to the representable range.
//! NaN maps to zero. The reference oracle applies the identical policy.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Widest raw integer a format may describe.
pub const MAX_BIT_WIDTH: u32 = 32;

/// Largest magnitude accepted for `fractional_bits`.
///
/// Keeps every representable value exactly expressible as an `f64`.
pub const MAX_FRACTIONAL_BITS: i32 = 64;

/// Shifts beyond this saturate (left) or vanish (right) without touching
/// the raw value, which keeps all intermediate results inside `i128`.
const SHIFT_LIMIT: u32 = 90;

/// Fixed-point number format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FixedPointFormat {
    bit_width: u32,
    fractional_bits: i32,
    signed: bool,
}

impl FixedPointFormat {
    /// Create a format, rejecting widths outside `1..=MAX_BIT_WIDTH`.
    pub fn new(bit_width: u32, fractional_bits: i32, signed: bool) -> Result<Self, FormatError> {
        if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
            return Err(FormatError::InvalidBitWidth { got: bit_width, max: MAX_BIT_WIDTH });
        }
        if fractional_bits.abs() > MAX_FRACTIONAL_BITS {
            return Err(FormatError::InvalidFractionalBits {
                got: fractional_bits,
                max: MAX_FRACTIONAL_BITS,
            });
        }
        Ok(Self { bit_width, fractional_bits, signed })
    }

    /// Signed integer format (`INTn`).
    pub fn int(bit_width: u32) -> Result<Self, FormatError> {
        Self::new(bit_width, 0, true)
    }

    /// Unsigned integer format (`UINTn`).
    pub fn uint(bit_width: u32) -> Result<Self, FormatError> {
        Self::new(bit_width, 0, false)
    }

    /// Format spanning `[0, 1]` as closely as `bit_width` allows.
    ///
    /// Signed formats spend one bit on the sign, so an 8-bit signed
    /// probability has 7 fractional bits and tops out at `127/128`.
    pub fn probability(bit_width: u32, signed: bool) -> Result<Self, FormatError> {
        let fractional = if signed { bit_width as i32 - 1 } else { bit_width as i32 };
        Self::new(bit_width, fractional, signed)
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn fractional_bits(&self) -> i32 {
        self.fractional_bits
    }

    /// Integer bits, `bit_width - fractional_bits` (may be negative).
    pub fn integer_bits(&self) -> i32 {
        self.bit_width as i32 - self.fractional_bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn min_raw(&self) -> i64 {
        if self.signed {
            -(1i64 << (self.bit_width - 1))
        } else {
            0
        }
    }

    pub fn max_raw(&self) -> i64 {
        if self.signed {
            (1i64 << (self.bit_width - 1)) - 1
        } else {
            (1i64 << self.bit_width) - 1
        }
    }

    /// Real value of one raw unit, `2^-fractional_bits`.
    pub fn step(&self) -> f64 {
        2f64.powi(-self.fractional_bits)
    }

    pub fn min_value(&self) -> f64 {
        self.dequantize(self.min_raw())
    }

    pub fn max_value(&self) -> f64 {
        self.dequantize(self.max_raw())
    }

    /// Clamp a wide raw integer into this format's range.
    pub fn saturate_raw(&self, raw: i128) -> i64 {
        raw.clamp(self.min_raw() as i128, self.max_raw() as i128) as i64
    }

    /// Round and saturate a real value to its raw representation.
    pub fn quantize_raw(&self, value: f64) -> i64 {
        if value.is_nan() {
            return 0;
        }
        let scaled = (value * 2f64.powi(self.fractional_bits)).round();
        let (lo, hi) = (self.min_raw(), self.max_raw());
        if scaled <= lo as f64 {
            lo
        } else if scaled >= hi as f64 {
            hi
        } else {
            scaled as i64
        }
    }

    /// Round and saturate a real value into this format.
    pub fn quantize(&self, value: f64) -> FixedPoint {
        FixedPoint { raw: self.quantize_raw(value), format: *self }
    }

    /// Saturating construction from a raw integer.
    pub fn from_raw(&self, raw: i64) -> FixedPoint {
        FixedPoint { raw: self.saturate_raw(raw as i128), format: *self }
    }

    /// Real value of a raw integer in this format.
    pub fn dequantize(&self, raw: i64) -> f64 {
        raw as f64 * self.step()
    }

    /// Format two operands are aligned to before addition: the finer of the
    /// two scales and enough integer bits for either operand (one more
    /// when an unsigned operand moves into a signed result), capped at
    /// `MAX_BIT_WIDTH`. Equal formats align to themselves.
    pub fn sum_format(&self, other: &FixedPointFormat) -> FixedPointFormat {
        if self == other {
            return *self;
        }
        let signed = self.signed || other.signed;
        let int_bits = |f: &FixedPointFormat| f.integer_bits() + i32::from(signed && !f.signed);
        let fractional_bits = self.fractional_bits.max(other.fractional_bits);
        let bits = (fractional_bits + int_bits(self).max(int_bits(other))).clamp(1, MAX_BIT_WIDTH as i32);
        FixedPointFormat { bit_width: bits as u32, fractional_bits, signed }
    }

    /// Whether `value` is exactly representable without rounding or saturation.
    pub fn is_representable(&self, value: f64) -> bool {
        let raw = self.quantize_raw(value);
        self.dequantize(raw) == value
    }
}

impl fmt::Display for FixedPointFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::datatype::canonical_name(self))
    }
}

impl From<FixedPointFormat> for String {
    fn from(format: FixedPointFormat) -> Self {
        format.to_string()
    }
}

impl TryFrom<String> for FixedPointFormat {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A raw integer paired with its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    raw: i64,
    format: FixedPointFormat,
}

impl FixedPoint {
    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn format(&self) -> FixedPointFormat {
        self.format
    }

    pub fn to_f64(&self) -> f64 {
        self.format.dequantize(self.raw)
    }

    pub fn to_f32(&self) -> f32 {
        self.to_f64() as f32
    }

    /// Convert into `target`, rounding dropped fraction bits to nearest
    /// (ties away from zero) and saturating in the target range.
    pub fn rescale(&self, target: FixedPointFormat) -> FixedPoint {
        let shift = target.fractional_bits - self.format.fractional_bits;
        let raw = shift_round(self.raw as i128, shift);
        FixedPoint { raw: target.saturate_raw(raw), format: target }
    }

    /// Add after aligning both operands to [`FixedPointFormat::sum_format`];
    /// `None` when the sum leaves that format's range.
    pub fn checked_add(&self, other: &FixedPoint) -> Option<FixedPoint> {
        let (sum, format) = self.aligned_sum(other);
        if sum < format.min_raw() as i128 || sum > format.max_raw() as i128 {
            return None;
        }
        Some(FixedPoint { raw: sum as i64, format })
    }

    /// Add after aligning both operands, clamping at the limits of the
    /// aligned format.
    pub fn saturating_add(&self, other: &FixedPoint) -> FixedPoint {
        let (sum, format) = self.aligned_sum(other);
        FixedPoint { raw: format.saturate_raw(sum), format }
    }

    /// Exact product in a format wide enough to hold it.
    pub fn widening_mul(&self, other: &FixedPoint) -> Result<FixedPoint, FormatError> {
        let bits = self.format.bit_width + other.format.bit_width;
        if bits > MAX_BIT_WIDTH {
            return Err(FormatError::TooWide { bits, max: MAX_BIT_WIDTH });
        }
        let format = FixedPointFormat::new(
            bits,
            self.format.fractional_bits + other.format.fractional_bits,
            self.format.signed || other.format.signed,
        )?;
        let product = self.raw as i128 * other.raw as i128;
        Ok(FixedPoint { raw: format.saturate_raw(product), format })
    }

    /// Order by real value; formats may differ.
    pub fn cmp_value(&self, other: &FixedPoint) -> Ordering {
        // Both sides are exact in f64 given the width and fraction limits.
        self.to_f64().total_cmp(&other.to_f64())
    }

    fn aligned_sum(&self, other: &FixedPoint) -> (i128, FixedPointFormat) {
        let format = self.format.sum_format(&other.format);
        let a = shift_round(self.raw as i128, format.fractional_bits - self.format.fractional_bits);
        let b = shift_round(other.raw as i128, format.fractional_bits - other.format.fractional_bits);
        (a.saturating_add(b), format)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.to_f64(), self.raw, self.format)
    }
}

/// Multiply by `2^shift`, rounding to nearest with ties away from zero
/// when `shift` is negative.
fn shift_round(raw: i128, shift: i32) -> i128 {
    if raw == 0 {
        return 0;
    }
    if shift >= 0 {
        let s = shift as u32;
        if s > SHIFT_LIMIT {
            return if raw > 0 { i128::MAX } else { i128::MIN };
        }
        raw << s
    } else {
        let s = shift.unsigned_abs();
        if s > SHIFT_LIMIT {
            return 0;
        }
        let half = 1i128 << (s - 1);
        if raw >= 0 {
            (raw + half) >> s
        } else {
            -((-raw + half) >> s)
        }
    }
}
