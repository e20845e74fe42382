//! Element types accepted in `.npy` payloads.

use std::fmt;

/// Little-endian element type of an array file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpyDtype {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
}

impl NpyDtype {
    /// Size of a single element in bytes.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 => 8,
        }
    }

    /// NumPy dtype descriptor string.
    #[must_use]
    pub const fn descr(self) -> &'static str {
        match self {
            Self::F32 => "<f4",
            Self::F64 => "<f8",
            Self::I8 => "|i1",
            Self::I16 => "<i2",
            Self::I32 => "<i4",
            Self::I64 => "<i8",
            Self::U8 => "|u1",
            Self::U16 => "<u2",
            Self::U32 => "<u4",
        }
    }

    /// Parse a NumPy dtype descriptor. Single-byte types accept any byte
    /// order marker since order is meaningless for them.
    pub fn from_descr(s: &str) -> Option<Self> {
        match s {
            "<f4" => Some(Self::F32),
            "<f8" => Some(Self::F64),
            "|i1" | "<i1" | "=i1" => Some(Self::I8),
            "<i2" => Some(Self::I16),
            "<i4" => Some(Self::I32),
            "<i8" => Some(Self::I64),
            "|u1" | "<u1" | "=u1" => Some(Self::U8),
            "<u2" => Some(Self::U16),
            "<u4" => Some(Self::U32),
            _ => None,
        }
    }

    /// Decode one element from its little-endian bytes.
    pub(crate) fn decode(self, bytes: &[u8]) -> f32 {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        match self {
            Self::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            Self::F64 => f64::from_le_bytes(buf) as f32,
            Self::I8 => buf[0] as i8 as f32,
            Self::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f32,
            Self::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f32,
            Self::I64 => i64::from_le_bytes(buf) as f32,
            Self::U8 => buf[0] as f32,
            Self::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f32,
            Self::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f32,
        }
    }
}

impl fmt::Display for NpyDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}
