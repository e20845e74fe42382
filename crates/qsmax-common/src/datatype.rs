//! Graph-style datatype names for fixed-point formats.
//!
//! | name          | bits | fractional bits | signed |
//! |---------------|------|-----------------|--------|
//! | `INTn`        | n    | 0               | yes    |
//! | `UINTn`       | n    | 0               | no     |
//! | `BINARY`      | 1    | 0               | no     |
//! | `FIXED<w,i>`  | w    | w - i           | yes    |
//! | `UFIXED<w,i>` | w    | w - i           | no     |

use crate::error::FormatError;
use crate::fixed_point::FixedPointFormat;
use std::str::FromStr;

impl FromStr for FixedPointFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        let unknown = || FormatError::UnknownDatatype(s.to_string());

        if name == "BINARY" {
            return FixedPointFormat::uint(1);
        }
        if let Some(args) = name.strip_prefix("UFIXED<").and_then(|r| r.strip_suffix('>')) {
            let (w, i) = parse_pair(args).ok_or_else(unknown)?;
            let fractional = (w as i32).checked_sub(i).ok_or_else(unknown)?;
            return FixedPointFormat::new(w, fractional, false);
        }
        if let Some(args) = name.strip_prefix("FIXED<").and_then(|r| r.strip_suffix('>')) {
            let (w, i) = parse_pair(args).ok_or_else(unknown)?;
            let fractional = (w as i32).checked_sub(i).ok_or_else(unknown)?;
            return FixedPointFormat::new(w, fractional, true);
        }
        if let Some(bits) = name.strip_prefix("UINT") {
            return FixedPointFormat::uint(bits.parse().map_err(|_| unknown())?);
        }
        if let Some(bits) = name.strip_prefix("INT") {
            return FixedPointFormat::int(bits.parse().map_err(|_| unknown())?);
        }
        Err(unknown())
    }
}

fn parse_pair(args: &str) -> Option<(u32, i32)> {
    let (w, i) = args.split_once(',')?;
    Some((w.trim().parse().ok()?, i.trim().parse().ok()?))
}

/// Name that parses back to the same format.
pub(crate) fn canonical_name(format: &FixedPointFormat) -> String {
    let w = format.bit_width();
    match (format.fractional_bits(), format.is_signed()) {
        (0, true) => format!("INT{w}"),
        (0, false) => format!("UINT{w}"),
        (_, true) => format!("FIXED<{w},{}>", format.integer_bits()),
        (_, false) => format!("UFIXED<{w},{}>", format.integer_bits()),
    }
}
