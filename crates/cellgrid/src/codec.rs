//! Plain delimited text: one line per row, fields joined by `,`.
//!
//! There is no quoting or escaping. A value containing the delimiter or a
//! line break is written as-is and will come back split; the encoder logs a
//! warning when that happens.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::store::CellStore;

pub const DELIMITER: char = ',';

pub fn encode<W: Write>(store: &CellStore, mut out: W) -> io::Result<()> {
    let mut hazards = 0usize;
    for (row, values) in store.iter_rows().enumerate() {
        for (col, value) in values.iter().enumerate() {
            if col > 0 {
                write!(out, "{DELIMITER}")?;
            }
            if value.contains([DELIMITER, '\n', '\r']) {
                if hazards == 0 {
                    warn!(
                        target: "cellgrid.codec",
                        row,
                        col,
                        "value contains a delimiter or line break and will not round-trip"
                    );
                }
                hazards += 1;
            }
            out.write_all(value.as_bytes())?;
        }
        out.write_all(b"\n")?;
    }
    if hazards > 1 {
        warn!(target: "cellgrid.codec", hazards, "values that will not round-trip");
    }
    out.flush()
}

/// Row count is the number of lines and column count the field count of the
/// first line. Later lines are padded with empty fields or truncated.
pub fn decode<R: BufRead>(input: R) -> io::Result<CellStore> {
    let lines = input.lines().collect::<io::Result<Vec<_>>>()?;
    Ok(CellStore::from_rows(
        lines.iter().map(|line| line.split(DELIMITER)),
    ))
}
