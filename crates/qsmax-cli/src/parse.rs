//! clap value parsers.

use qsmax_common::{ExecMode, FixedPointFormat};

/// `1,128` or `2x4x384`.
pub fn parse_shape(s: &str) -> Result<Vec<usize>, String> {
    let dims: Vec<usize> = s
        .split([',', 'x'])
        .map(|d| d.trim().parse::<usize>().map_err(|_| format!("invalid dimension '{d}' in shape '{s}'")))
        .collect::<Result<_, _>>()?;
    if dims.is_empty() || dims.contains(&0) {
        return Err(format!("shape '{s}' must have non-zero dimensions"));
    }
    Ok(dims)
}

pub fn parse_datatype(s: &str) -> Result<FixedPointFormat, String> {
    s.parse().map_err(|e: qsmax_common::FormatError| e.to_string())
}

/// Names the accepted modes on failure.
pub fn parse_exec_mode(s: &str) -> Result<ExecMode, String> {
    s.parse().map_err(|_| {
        let names: Vec<&str> = ExecMode::ALL.iter().map(|m| m.name()).collect();
        format!("unknown execution mode '{s}' (expected one of {})", names.join(", "))
    })
}
