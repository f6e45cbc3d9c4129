use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which dimension an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => f.write_str("row"),
            Axis::Column => f.write_str("column"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("{axis} index {index} out of range (len {len})")]
    IndexOutOfRange { axis: Axis, index: usize, len: usize },
    #[error("cannot insert {axis} after {after} (len {len})")]
    InsertOutOfRange { axis: Axis, after: usize, len: usize },
    #[error("io error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

impl GridError {
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            GridError::IndexOutOfRange { .. } | GridError::InsertOutOfRange { .. }
        )
    }
}

pub type GridResult<T> = Result<T, GridError>;

pub(crate) fn check_index(axis: Axis, index: usize, len: usize) -> GridResult<()> {
    if index >= len {
        return Err(GridError::IndexOutOfRange { axis, index, len });
    }
    Ok(())
}

/// `None` anchors before the first entry; `Some(i)` needs `i < len`.
pub(crate) fn check_anchor(axis: Axis, after: Option<usize>, len: usize) -> GridResult<()> {
    match after {
        Some(after) if after >= len => Err(GridError::InsertOutOfRange { axis, after, len }),
        _ => Ok(()),
    }
}
