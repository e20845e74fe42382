//! Bit-vector packing for the streaming ports.
//!
//! A chunk of `SIMD` lanes of `b` bits becomes one `SIMD * b` bit word,
//! lane 0 in the least significant bits. Each lane is masked to `b` bits
//! (two's complement for signed formats); unpacking sign-extends.

use crate::stream::Chunk;
use qsmax_common::{FixedPointFormat, SoftmaxConfig};

/// Little-endian multi-limb bit vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedWord {
    width: usize,
    limbs: Vec<u64>,
}

impl PackedWord {
    pub fn zeroed(width: usize) -> Self {
        Self { width, limbs: vec![0; width.div_ceil(64)] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn limbs(&self) -> &[u64] {
        &self.limbs
    }

    /// Write `bits` low bits of `value` starting at bit `offset`.
    fn set_field(&mut self, offset: usize, bits: u32, value: u64) {
        for i in 0..bits as usize {
            let pos = offset + i;
            if (value >> i) & 1 == 1 {
                self.limbs[pos / 64] |= 1 << (pos % 64);
            }
        }
    }

    fn field(&self, offset: usize, bits: u32) -> u64 {
        (0..bits as usize).fold(0u64, |acc, i| {
            let pos = offset + i;
            acc | (((self.limbs[pos / 64] >> (pos % 64)) & 1) << i)
        })
    }

    /// Hex string, most significant digit first, as simulators print it.
    pub fn to_hex(&self) -> String {
        let digits = self.width.div_ceil(4).max(1);
        (0..digits)
            .rev()
            .map(|d| {
                let nibble = self.field_clamped(d * 4, 4);
                char::from_digit(nibble as u32, 16).unwrap_or('0')
            })
            .collect()
    }

    fn field_clamped(&self, offset: usize, bits: u32) -> u64 {
        let bits = bits.min(self.width.saturating_sub(offset) as u32);
        self.field(offset, bits)
    }
}

fn lane_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Pack a chunk into a word of `simd * bit_width` bits.
pub fn pack_chunk(chunk: &Chunk) -> PackedWord {
    let bits = chunk.format().bit_width();
    let mut word = PackedWord::zeroed(chunk.simd() * bits as usize);
    for (lane, &raw) in chunk.raw().iter().enumerate() {
        word.set_field(lane * bits as usize, bits, raw as u64 & lane_mask(bits));
    }
    word
}

/// Unpack `simd` lanes of `format` from a word.
pub fn unpack_chunk(word: &PackedWord, format: FixedPointFormat, simd: usize) -> Chunk {
    let bits = format.bit_width();
    let lanes = (0..simd).map(|lane| {
        let field = word.field(lane * bits as usize, bits);
        if format.is_signed() && bits < 64 && (field >> (bits - 1)) & 1 == 1 {
            (field | !lane_mask(bits)) as i64
        } else {
            field as i64
        }
    });
    Chunk::from_raw(format, lanes)
}

/// Raw input port width, `SIMD * input_bits`.
pub fn instream_width(config: &SoftmaxConfig) -> usize {
    config.simd() * config.input_format().bit_width() as usize
}

/// Raw output port width, `SIMD * output_bits`.
pub fn outstream_width(config: &SoftmaxConfig) -> usize {
    config.simd() * config.output_format().bit_width() as usize
}

/// Round a port width up to whole bytes.
pub fn axi_aligned(width: usize) -> usize {
    width.div_ceil(8) * 8
}
