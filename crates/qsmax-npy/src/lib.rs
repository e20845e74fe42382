//! `.npy` array files
//!
//! The compiled node model exchanges tensors with the host through NumPy
//! array files. Only what that boundary needs is supported: C-ordered
//! little-endian numeric payloads, read into `f32` and written as `<f4`.
//!
//! Layout: `\x93NUMPY` | major(1) | minor(1) | header_len(u16 LE, u32 for v2)
//! | header dict | data

mod dtype;

pub use dtype::NpyDtype;

use qsmax_common::QsmaxError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const NUMPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Header plus payload is padded to this many bytes.
const HEADER_ALIGN: usize = 64;

/// Errors from reading or writing array files.
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("not an npy file: bad magic {actual:?}")]
    InvalidMagic { actual: Vec<u8> },

    #[error("unsupported npy version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unsupported dtype '{0}'")]
    UnsupportedDtype(String),

    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("malformed npy header: {0}")]
    InvalidHeader(String),

    #[error("shape {0:?} has more elements than fit in memory")]
    ShapeOverflow(Vec<usize>),

    #[error("shape {shape:?} needs {expected} elements, got {got}")]
    DataLength { shape: Vec<usize>, expected: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NpyError> for QsmaxError {
    fn from(e: NpyError) -> Self {
        match e {
            NpyError::Io(io) => QsmaxError::Io(io),
            other => QsmaxError::ArrayFile(other.to_string()),
        }
    }
}

/// Dense C-ordered `f32` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayF32 {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl ArrayF32 {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, NpyError> {
        let expected = element_count(&shape).ok_or_else(|| NpyError::ShapeOverflow(shape.clone()))?;
        if expected != data.len() {
            return Err(NpyError::DataLength { shape, expected, got: data.len() });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same data under another shape with the same element count.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, NpyError> {
        Self::new(shape, self.data)
    }

    /// Serialize as a v1.0 (v2.0 when the header does not fit) `<f4` file.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), NpyError> {
        let shape_str = if self.shape.len() == 1 {
            format!("({},)", self.shape[0])
        } else {
            let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        };
        let header_dict = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {shape_str}, }}",
            NpyDtype::F32.descr()
        );

        let v1 = header_dict.len() + 11 < u16::MAX as usize;
        let prefix_len = 6 + 2 + if v1 { 2 } else { 4 };
        let unpadded = prefix_len + header_dict.len() + 1;
        let padding = (HEADER_ALIGN - (unpadded % HEADER_ALIGN)) % HEADER_ALIGN;
        let padded_header = format!("{header_dict}{}\n", " ".repeat(padding));

        writer.write_all(NUMPY_MAGIC)?;
        if v1 {
            writer.write_all(&[1u8, 0u8])?;
            writer.write_all(&(padded_header.len() as u16).to_le_bytes())?;
        } else {
            writer.write_all(&[2u8, 0u8])?;
            writer.write_all(&(padded_header.len() as u32).to_le_bytes())?;
        }
        writer.write_all(padded_header.as_bytes())?;
        for v in &self.data {
            writer.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Deserialize any supported payload, converting elements to `f32`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, NpyError> {
        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic)?;
        if &magic != NUMPY_MAGIC {
            return Err(NpyError::InvalidMagic { actual: magic.to_vec() });
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version)?;
        let header_len = match version[0] {
            1 => {
                let mut buf = [0u8; 2];
                reader.read_exact(&mut buf)?;
                u16::from_le_bytes(buf) as usize
            }
            2 => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                u32::from_le_bytes(buf) as usize
            }
            major => return Err(NpyError::UnsupportedVersion { major, minor: version[1] }),
        };

        let mut header_bytes = vec![0u8; header_len];
        reader.read_exact(&mut header_bytes)?;
        let header = std::str::from_utf8(&header_bytes)
            .map_err(|e| NpyError::InvalidHeader(format!("invalid header UTF-8: {e}")))?
            .trim();

        let dtype = parse_descr(header)?;
        if parse_fortran_order(header)? {
            return Err(NpyError::FortranOrder);
        }
        let shape = parse_shape(header)?;

        let payload_len = element_count(&shape)
            .and_then(|count| count.checked_mul(dtype.element_size()))
            .ok_or_else(|| NpyError::InvalidHeader("shape overflows".into()))?;
        // Header sizes are untrusted; allocate as bytes arrive.
        let mut payload = Vec::new();
        reader.by_ref().take(payload_len as u64).read_to_end(&mut payload)?;
        if payload.len() != payload_len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("payload has {} bytes, header promises {payload_len}", payload.len()),
            )
            .into());
        }
        let data = payload.chunks_exact(dtype.element_size()).map(|b| dtype.decode(b)).collect();

        debug!(%dtype, ?shape, "read npy array");
        Self::new(shape, data)
    }
}

/// Read an array file from disk.
pub fn read_npy(path: &Path) -> Result<ArrayF32, NpyError> {
    let mut reader = BufReader::new(File::open(path)?);
    ArrayF32::read_from(&mut reader)
}

/// Write an array file to disk as `<f4`.
pub fn write_npy(path: &Path, array: &ArrayF32) -> Result<(), NpyError> {
    let mut writer = BufWriter::new(File::create(path)?);
    array.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let quoted = format!("'{key}'");
    let start = header
        .find(&quoted)
        .ok_or_else(|| NpyError::InvalidHeader(format!("missing {key}")))?;
    let after = &header[start + quoted.len()..];
    let colon =
        after.find(':').ok_or_else(|| NpyError::InvalidHeader(format!("bad {key} format")))?;
    Ok(after[colon + 1..].trim_start())
}

fn parse_descr(header: &str) -> Result<NpyDtype, NpyError> {
    let value = dict_value(header, "descr")?;
    let value = value
        .strip_prefix('\'')
        .ok_or_else(|| NpyError::InvalidHeader("descr is not a string".into()))?;
    let end = value.find('\'').ok_or_else(|| NpyError::InvalidHeader("unterminated descr".into()))?;
    let descr = &value[..end];
    NpyDtype::from_descr(descr).ok_or_else(|| NpyError::UnsupportedDtype(descr.to_string()))
}

fn parse_fortran_order(header: &str) -> Result<bool, NpyError> {
    let value = dict_value(header, "fortran_order")?;
    if value.starts_with("True") {
        Ok(true)
    } else if value.starts_with("False") {
        Ok(false)
    } else {
        Err(NpyError::InvalidHeader("fortran_order must be True or False".into()))
    }
}

fn parse_shape(header: &str) -> Result<Vec<usize>, NpyError> {
    let value = dict_value(header, "shape")?;
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.find(')').map(|end| &v[..end]))
        .ok_or_else(|| NpyError::InvalidHeader("bad shape format".into()))?;
    inner
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| NpyError::InvalidHeader(format!("bad shape dim: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(array: &ArrayF32) -> Vec<u8> {
        let mut buf = Vec::new();
        array.write_to(&mut buf).unwrap();
        buf
    }

    /// Hand-built v1 file with an arbitrary header dict.
    fn raw_file(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut buf = NUMPY_MAGIC.to_vec();
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&((header.len() + 1) as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn magic_and_alignment() {
        let buf = encode(&ArrayF32::new(vec![3], vec![1.0, 2.0, 3.0]).unwrap());
        assert_eq!(&buf[..6], b"\x93NUMPY");
        assert_eq!(&buf[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);
        assert_eq!(buf[10 + header_len - 1], b'\n');
    }

    #[test]
    fn one_dimensional_shape_has_trailing_comma() {
        let buf = encode(&ArrayF32::new(vec![5], vec![0.0; 5]).unwrap());
        let text = String::from_utf8_lossy(&buf[10..]);
        assert!(text.contains("'shape': (5,)"), "header: {text}");
    }

    #[test]
    fn reads_back_nd() {
        let data: Vec<f32> = (0..24).map(|i| i as f32 * 0.5 - 3.0).collect();
        let array = ArrayF32::new(vec![2, 3, 4], data).unwrap();
        let back = ArrayF32::read_from(&mut Cursor::new(encode(&array))).unwrap();
        assert_eq!(back, array);
    }

    #[test]
    fn scalar_shape() {
        let array = ArrayF32::new(vec![], vec![7.0]).unwrap();
        let back = ArrayF32::read_from(&mut Cursor::new(encode(&array))).unwrap();
        assert_eq!(back.shape(), &[] as &[usize]);
        assert_eq!(back.data(), &[7.0]);
    }

    #[test]
    fn reads_integer_payloads() {
        let payload: Vec<u8> = [-128i8, -1, 0, 127].iter().map(|v| *v as u8).collect();
        let file = raw_file("{'descr': '|i1', 'fortran_order': False, 'shape': (2, 2), }", &payload);
        let array = ArrayF32::read_from(&mut Cursor::new(file)).unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array.data(), &[-128.0, -1.0, 0.0, 127.0]);
    }

    #[test]
    fn reads_version_two_header() {
        let header = "{'descr': '<i2', 'fortran_order': False, 'shape': (2,), }\n";
        let mut file = NUMPY_MAGIC.to_vec();
        file.extend_from_slice(&[2, 0]);
        file.extend_from_slice(&(header.len() as u32).to_le_bytes());
        file.extend_from_slice(header.as_bytes());
        file.extend_from_slice(&300i16.to_le_bytes());
        file.extend_from_slice(&(-2i16).to_le_bytes());
        let array = ArrayF32::read_from(&mut Cursor::new(file)).unwrap();
        assert_eq!(array.data(), &[300.0, -2.0]);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = ArrayF32::read_from(&mut Cursor::new(b"BADMAGIC\x01\x00".to_vec())).unwrap_err();
        assert!(matches!(err, NpyError::InvalidMagic { .. }));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut file = NUMPY_MAGIC.to_vec();
        file.extend_from_slice(&[3, 0, 0, 0]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::UnsupportedVersion { major: 3, minor: 0 }));
    }

    #[test]
    fn rejects_fortran_order() {
        let file = raw_file("{'descr': '<f4', 'fortran_order': True, 'shape': (1,), }", &[0; 4]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::FortranOrder));
    }

    #[test]
    fn rejects_unsupported_dtype() {
        let file = raw_file("{'descr': '>f4', 'fortran_order': False, 'shape': (1,), }", &[0; 4]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::UnsupportedDtype(ref d) if d == ">f4"));
    }

    #[test]
    fn truncated_payload_is_io_error() {
        let file = raw_file("{'descr': '<f4', 'fortran_order': False, 'shape': (4,), }", &[0; 8]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::Io(_)));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let file = raw_file("{'descr': '<f4', 'fortran_order': False, 'shape': (18446744073709551615, 2), }", &[]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::InvalidHeader(ref m) if m.contains("overflows")));

        // element count fits but the byte count does not
        let file = raw_file("{'descr': '<f4', 'fortran_order': False, 'shape': (4611686018427387904,), }", &[]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::InvalidHeader(_)));

        let err = ArrayF32::new(vec![usize::MAX, 2], vec![]).unwrap_err();
        assert!(matches!(err, NpyError::ShapeOverflow(_)));
    }

    #[test]
    fn huge_shape_without_payload_is_io_error() {
        let file = raw_file("{'descr': '<f4', 'fortran_order': False, 'shape': (1000000000, 4), }", &[0; 16]);
        let err = ArrayF32::read_from(&mut Cursor::new(file)).unwrap_err();
        assert!(matches!(err, NpyError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn length_mismatch_on_construction() {
        let err = ArrayF32::new(vec![2, 2], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, NpyError::DataLength { expected: 4, got: 3, .. }));
    }

    #[test]
    fn reshape_keeps_data() {
        let array = ArrayF32::new(vec![1, 8], (0..8).map(|i| i as f32).collect()).unwrap();
        let folded = array.clone().reshape(vec![1, 2, 4]).unwrap();
        assert_eq!(folded.data(), array.data());
        assert!(array.reshape(vec![3, 3]).is_err());
    }

    #[test]
    fn converts_into_qsmax_error() {
        let err: QsmaxError = NpyError::FortranOrder.into();
        assert!(matches!(err, QsmaxError::ArrayFile(_)));
    }
}
